//! Record source interface

use crate::error::FetchError;
use crate::record::{PageRequest, TransferRecord};

/// A paginated source of transfer records.
///
/// Implementations issue exactly one request per call and never retry.
/// A response without a `transfers` field decodes to an empty page, which
/// the paginator treats as end-of-stream.
pub trait RecordSource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError> {
        (**self).fetch_page(request)
    }
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError> {
        (**self).fetch_page(request)
    }
}
