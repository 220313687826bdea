use std::time::Duration;

use apikeys::utils::{FORM_ID_PREFIX, generate_id};
use moka::sync::Cache;
use snafu::OptionExt;

use crate::{Result, error::FormExpiredSnafu, services::token::FORM_TOKEN_TTL_SECS};

use super::CreateTokenForm;

const MAX_MOUNTED_FORMS: u64 = 10_000;

/// Mounted create-token forms, addressed by form id
#[derive(Clone)]
pub struct FormRegistry {
    forms: Cache<String, CreateTokenForm>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(FORM_TOKEN_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let forms = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(MAX_MOUNTED_FORMS)
            .eviction_listener(|_id, form: CreateTokenForm, _cause| form.unmount())
            .build();

        Self { forms }
    }

    pub fn mount(&self) -> CreateTokenForm {
        let id = generate_id(FORM_ID_PREFIX);
        let form = CreateTokenForm::new(&id);
        self.forms.insert(id, form.clone());
        form
    }

    pub fn get(&self, id: &str) -> Result<CreateTokenForm> {
        self.forms.get(id).context(FormExpiredSnafu)
    }

    /// Removes the form; returns false when it was already gone
    pub fn unmount(&self, id: &str) -> bool {
        match self.forms.remove(id) {
            Some(form) => {
                form.unmount();
                true
            }
            None => false,
        }
    }
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::forms::FormState;
    use apikeys::utils::valid_id;

    #[test]
    fn test_mount_and_get() {
        let registry = FormRegistry::new();
        let form = registry.mount();
        assert!(valid_id(FORM_ID_PREFIX, form.id()));
        assert_eq!(form.state(), FormState::Loading);

        let found = registry.get(form.id()).unwrap();
        assert_eq!(found.id(), form.id());
    }

    #[test]
    fn test_forms_share_state() {
        let registry = FormRegistry::new();
        let form = registry.mount();

        let found = registry.get(form.id()).unwrap();
        found.mark_ready(crate::test_utils::config_days(30));
        assert_eq!(form.state(), FormState::Idle);
    }

    #[test]
    fn test_unmount() {
        let registry = FormRegistry::new();
        let form = registry.mount();

        assert!(registry.unmount(form.id()));
        assert!(!form.is_mounted());
        assert!(matches!(registry.get(form.id()), Err(Error::FormExpired)));
        assert!(!registry.unmount(form.id()));
    }

    #[test]
    fn test_unknown_form() {
        let registry = FormRegistry::new();
        assert!(matches!(registry.get("ctf_missing"), Err(Error::FormExpired)));
    }

    #[test]
    fn test_expired_forms_are_unmounted() {
        let registry = FormRegistry::with_ttl(Duration::from_millis(10));
        let form = registry.mount();

        std::thread::sleep(Duration::from_millis(50));
        assert!(registry.get(form.id()).is_err());

        // Expired entries are evicted on maintenance
        registry.forms.run_pending_tasks();
        assert!(!form.is_mounted());
    }
}
