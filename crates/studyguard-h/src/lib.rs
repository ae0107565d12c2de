pub mod cdp;
pub mod source;
