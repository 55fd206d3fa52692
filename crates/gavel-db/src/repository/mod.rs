mod artefact;
mod product_version;

pub use artefact::ArtefactRepository;
pub use product_version::ProductVersionRepository;
