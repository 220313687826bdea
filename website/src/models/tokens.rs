use apikeys::lifetime::LifetimeChoice;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, forms::TokenFormValues};

/// Create token form as posted by the browser
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct CreateTokenFormData {
    pub token: String,
    pub name: String,
    pub lifetime: String,
    pub expires_at: Option<String>,
}

impl CreateTokenFormData {
    pub fn values(&self) -> Result<TokenFormValues> {
        let lifetime = LifetimeChoice::parse(&self.lifetime, self.expires_at.as_deref())
            .map_err(|e| Error::Validation {
                msg: format!("lifetime: {}", e),
            })?;

        Ok(TokenFormValues {
            name: self.name.clone(),
            lifetime,
        })
    }

    /// Refills the visible fields from previously submitted values
    pub fn with_values(mut self, values: &TokenFormValues) -> Self {
        self.name = values.name.clone();
        self.lifetime = values.lifetime.value();
        self.expires_at = values.lifetime.custom_date();
        self
    }
}
