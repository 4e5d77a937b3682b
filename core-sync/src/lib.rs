//! # Publication Sync Engine
//!
//! Reconciles a remote content database against a directory of markdown
//! artifacts.
//!
//! ## Overview
//!
//! For every pass the engine decides, per remote record and per local file,
//! whether to write, delete or leave it alone:
//! - Querying publishable records through `RemoteStore`
//! - Flattening each record into header metadata
//! - Deriving the artifact path from the record kind and naming properties
//! - Deleting local posts whose record is gone or renamed
//! - Pushing selected local header values back to the store
//! - Converting record bodies through `ContentConverter` and re-hosting images
//!
//! ## Components
//!
//! - **Record Projector** (`projector`): Typed properties to a flat, sparse mapping
//! - **Path Resolver** (`path`): Page and post artifact locations
//! - **Local State Reader** (`local`): Header extraction from existing artifacts
//! - **Asset Rewriter** (`assets`): Image detection and re-hosting
//! - **Artifact Writer** (`writer`): Header + body serialization
//! - **Sync Coordinator** (`coordinator`): The reconciliation pass

pub mod assets;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod path;
pub mod projector;
pub mod writer;

pub use assets::{AssetRewriter, ExtensionImageMatcher, ImageMatcher, ImageReference};
pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use error::{Result, SyncError};
pub use local::{LocalArtifact, LocalStateReader};
pub use path::{PathResolver, ResolvedPath};
pub use projector::{ProjectedProperties, RecordKind, RecordProjector};
pub use writer::ArtifactWriter;
