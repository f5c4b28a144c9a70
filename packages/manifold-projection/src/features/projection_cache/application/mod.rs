mod projection_cache;
mod resolve_scope;

pub use projection_cache::ProjectionCache;
pub use resolve_scope::{Ancestry, AugmentGuard, InProgressGuard, Resolution, ResolveScope};
