//! Native request/response objects and their bodies.

mod body;
mod form;
mod native;

pub use body::{Blob, Body, BodyError, ReadBody};
pub use form::{FormData, FormValue, MULTIPART, URLENCODED};
pub use native::{NativeRequest, NativeResponse};
