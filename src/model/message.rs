/// Entry in the UI activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    User(String),
    System(String),
    Warning(String),
    Error(String),
}

impl Message {
    pub fn text(&self) -> &str {
        match self {
            Message::User(t) | Message::System(t) | Message::Warning(t) | Message::Error(t) => t,
        }
    }
}
