pub mod filters;
pub(crate) mod http;
pub mod local;
pub mod atlas;
pub mod meridian;
pub mod registry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use atlas::AtlasAdapter;
pub use local::LocalAdapter;
pub use meridian::MeridianAdapter;
pub use registry::SupplierRegistry;
