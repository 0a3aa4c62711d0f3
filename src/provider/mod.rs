//! Remote provider access
//!
//! This module holds everything that talks to the note platform:
//! - The [`NoteSource`] trait the crawler walks through
//! - The raw payload types returned by the listing and detail endpoints
//! - Request signing behind the [`RequestSigner`] trait
//! - [`WebApiSource`], the reqwest-backed implementation

mod payload;
mod signer;
mod traits;
mod web;

pub use payload::{
    RawConsumer, RawImage, RawImageInfo, RawInteract, RawNote, RawNoteCard, RawTag, RawUser,
    RawVideo,
};
pub use signer::{CommandSigner, CookieSigner, RequestSigner, SignedRequest, SigningInput};
pub use traits::{ListingPage, NoteSource, ProviderError, ProviderResult};
pub use web::{build_http_client, WebApiSource};
