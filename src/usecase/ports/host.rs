use crate::domain::entities::args::QueryArgs;

/// Request-side collaborator: incoming arguments in, user-facing messages out.
pub trait RequestHost: Send + Sync {
    fn request_args(&self) -> QueryArgs;
    fn flash_message(&self, category: &str, message: &str);
}
