/// Static page that drives `/models`, `/chat`, and `/stream` from a browser.
pub const PLAYGROUND_HTML: &str = include_str!("playground.html");
