use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Danger,
}

impl FlashLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Danger => "danger",
        }
    }
}

/// One-shot message carried across a redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

pub fn push(cookies: &Cookies, level: FlashLevel, message: impl Into<String>) {
    let mut pending = cookies
        .get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default();
    pending.push(Flash::new(level, message));

    let cookie = Cookie::build((FLASH_COOKIE, encode(&pending)))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
}

pub fn success(cookies: &Cookies, message: impl Into<String>) {
    push(cookies, FlashLevel::Success, message);
}

pub fn info(cookies: &Cookies, message: impl Into<String>) {
    push(cookies, FlashLevel::Info, message);
}

pub fn danger(cookies: &Cookies, message: impl Into<String>) {
    push(cookies, FlashLevel::Danger, message);
}

/// Returns and clears every pending message.
pub fn take(cookies: &Cookies) -> Vec<Flash> {
    match cookies.get(FLASH_COOKIE) {
        Some(cookie) => {
            let messages = decode(cookie.value());
            let mut removal = Cookie::from(FLASH_COOKIE);
            removal.set_path("/");
            cookies.remove(removal);
            messages
        }
        None => Vec::new(),
    }
}

fn encode(messages: &[Flash]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    urlencoding::encode(&json).into_owned()
}

fn decode(raw: &str) -> Vec<Flash> {
    urlencoding::decode(raw)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_value_is_cookie_safe() {
        let encoded = encode(&[Flash::new(FlashLevel::Danger, "Cannot issue 20 units; only 5, \"left\"")]);
        assert!(!encoded.contains(&[' ', ';', ',', '"'][..]));
        assert_eq!(decode(&encoded)[0].message, "Cannot issue 20 units; only 5, \"left\"");
    }

    #[test]
    fn garbage_decodes_to_nothing() {
        assert!(decode("%%%").is_empty());
        assert!(decode("not json").is_empty());
    }

    #[test]
    fn messages_accumulate_until_taken() {
        let cookies = Cookies::default();
        success(&cookies, "Lab added successfully.");
        danger(&cookies, "Lab name is required.");

        let messages = take(&cookies);
        assert_eq!(
            messages,
            vec![
                Flash::new(FlashLevel::Success, "Lab added successfully."),
                Flash::new(FlashLevel::Danger, "Lab name is required."),
            ]
        );
        assert!(take(&cookies).is_empty());
    }
}
