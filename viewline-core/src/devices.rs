use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

/// Binds devices to accounts, one device per account and one account per
/// device. A binding is created once and never updated or expired, so a
/// conflicting registration is a fraud signal rather than an overwrite.
#[derive(Default)]
pub struct DeviceRegistry {
    bindings: Mutex<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A new binding was created
    Registered,
    /// The device is already bound to this exact account
    AlreadyRegistered,
    /// The device is bound to a different account
    FraudConflict,
    /// The account already owns a different device
    MultipleDevicesNotAllowed,
}

impl RegisterOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::AlreadyRegistered => "already_registered",
            Self::FraudConflict => "fraud_conflict",
            Self::MultipleDevicesNotAllowed => "multiple_devices_not_allowed",
        }
    }

    /// Whether the registration was refused
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::FraudConflict | Self::MultipleDevicesNotAllowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// The device has no binding at all
    NotRegistered,
    /// The device is bound to a different account
    Mismatch,
}

impl Verification {
    pub fn verified(&self) -> bool {
        matches!(self, Self::Verified)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NotRegistered => "not_registered",
            Self::Mismatch => "fraud_conflict",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceBinding {
    pub device_id: String,
    pub account_id: String,
}

impl DeviceRegistry {
    /// Attempts to bind a device to an account. The whole check-then-insert
    /// runs under the registry lock, so two racing registrations cannot both
    /// create a binding.
    pub fn register(&self, account_id: &str, device_id: &str) -> RegisterOutcome {
        let mut bindings = self.bindings.lock();

        if let Some(bound_account) = bindings.get(device_id) {
            if bound_account == account_id {
                return RegisterOutcome::AlreadyRegistered;
            }

            return RegisterOutcome::FraudConflict;
        }

        // Linear scan, the registry stays small enough for this
        let account_has_device = bindings.values().any(|a| a == account_id);

        if account_has_device {
            return RegisterOutcome::MultipleDevicesNotAllowed;
        }

        bindings.insert(device_id.to_string(), account_id.to_string());
        RegisterOutcome::Registered
    }

    /// Checks that the device's binding matches the account exactly
    pub fn verify(&self, account_id: &str, device_id: &str) -> Verification {
        match self.bindings.lock().get(device_id) {
            None => Verification::NotRegistered,
            Some(bound_account) if bound_account == account_id => Verification::Verified,
            Some(_) => Verification::Mismatch,
        }
    }

    /// Returns the device bound to an account, if any
    pub fn device_for(&self, account_id: &str) -> Option<String> {
        self.bindings
            .lock()
            .iter()
            .find(|(_, a)| a.as_str() == account_id)
            .map(|(d, _)| d.clone())
    }

    /// All current bindings, for diagnostics
    pub fn bindings(&self) -> Vec<DeviceBinding> {
        self.bindings
            .lock()
            .iter()
            .map(|(device_id, account_id)| DeviceBinding {
                device_id: device_id.clone(),
                account_id: account_id.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::{DeviceRegistry, RegisterOutcome, Verification};

    #[test]
    fn registration() {
        let registry = DeviceRegistry::default();

        assert_eq!(
            registry.register("alice", "device-a"),
            RegisterOutcome::Registered
        );

        // Re-registering the same pair is an idempotent success
        assert_eq!(
            registry.register("alice", "device-a"),
            RegisterOutcome::AlreadyRegistered
        );

        assert!(registry.verify("alice", "device-a").verified());
        assert_eq!(registry.device_for("alice"), Some("device-a".to_string()));
    }

    #[test]
    fn device_cannot_change_hands() {
        let registry = DeviceRegistry::default();

        registry.register("alice", "device-a");

        assert_eq!(
            registry.register("mallory", "device-a"),
            RegisterOutcome::FraudConflict
        );

        // The binding must be unchanged after the conflict
        assert!(registry.verify("alice", "device-a").verified());
        assert_eq!(
            registry.verify("mallory", "device-a"),
            Verification::Mismatch
        );
        assert_eq!(registry.device_for("mallory"), None);
    }

    #[test]
    fn account_cannot_own_two_devices() {
        let registry = DeviceRegistry::default();

        registry.register("alice", "device-a");

        assert_eq!(
            registry.register("alice", "device-b"),
            RegisterOutcome::MultipleDevicesNotAllowed
        );

        assert_eq!(
            registry.verify("alice", "device-b"),
            Verification::NotRegistered
        );
        assert_eq!(registry.bindings().len(), 1);
    }
}
