#![forbid(unsafe_code)]

mod digest;
mod time;

pub use digest::sha256_hex;
pub use time::now_rfc3339;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
