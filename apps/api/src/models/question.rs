/// A fixed multiple-choice question. Defined at build time, immutable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
}

impl Question {
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| *o == option)
    }
}
