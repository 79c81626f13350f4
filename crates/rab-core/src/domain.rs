/// Telegram chat id (numeric); replies are addressed to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Id of one inbound update. Telegram assigns them in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(pub i64);

/// "This user saved this URL."
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Page {
    pub user_name: String,
    pub url: String,
}

impl Page {
    pub fn new(user_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            url: url.into(),
        }
    }
}
