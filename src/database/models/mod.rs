pub mod brand_voice;
pub mod document;
pub mod folder;
pub mod persona;
pub mod project;
pub mod snippet;
pub mod usage;
pub mod user_settings;

pub use brand_voice::BrandVoice;
pub use document::{Document, DocumentMetadata, SectionData, TemplateProgress};
pub use folder::Folder;
pub use persona::Persona;
pub use project::Project;
pub use snippet::Snippet;
pub use usage::{UsageLog, UsageTotals};
pub use user_settings::UserSettings;
