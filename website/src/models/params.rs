use serde::Deserialize;

#[derive(Deserialize)]
pub struct FormParams {
    pub form_id: String,
}
