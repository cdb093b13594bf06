pub mod appwrite;
pub mod gemini;

pub use appwrite::{
    AppwriteCatalogAdapter, AppwriteClient, AppwriteIdentityAdapter, AppwriteStorageAdapter,
};
pub use gemini::GeminiTextAdapter;
