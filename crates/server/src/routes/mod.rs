#![forbid(unsafe_code)]

pub(crate) mod attachments;
pub(crate) mod checklist;
pub(crate) mod session;
pub(crate) mod transformers;

pub(crate) async fn healthz() -> &'static str {
    "ok"
}
