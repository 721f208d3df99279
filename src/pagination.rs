//! Page slicing over a fetched batch

use crate::data::Question;

/// Default number of questions per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Returns page `page` (1-indexed) of `batch`
///
/// The slice is `[(page - 1) * page_size, page * page_size)` clamped to the
/// batch length. Pages past the end, and page 0, come back empty.
pub fn paginate(batch: &[Question], page: u32, page_size: u32) -> Vec<Question> {
    if page == 0 {
        return Vec::new();
    }

    let size = page_size as usize;
    let start = (page as usize - 1).saturating_mul(size).min(batch.len());
    let end = start.saturating_add(size).min(batch.len());

    batch[start..end].to_vec()
}
