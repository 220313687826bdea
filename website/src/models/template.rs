/// Data shared by every full page template
#[derive(Clone)]
pub struct TemplateData {
    pub title: String,
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
}

impl TemplateData {
    pub fn new(title: &str) -> TemplateData {
        TemplateData {
            title: title.to_string(),
            styles: vec![String::from("/assets/main.css")],
            scripts: vec![String::from("/assets/htmx.min.js")],
        }
    }
}
