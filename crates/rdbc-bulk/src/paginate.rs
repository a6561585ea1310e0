//! Splitting row sets into pages
//!
//! Pages are contiguous, keep input order, and are at most `page_size` long;
//! only the last page may be shorter.

use crate::error::ValidationError;

/// Number of pages needed for `len` items
#[inline]
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Borrow `items` as consecutive pages of at most `page_size` items.
///
/// ```
/// use rdbc_bulk::paginate::paginate;
///
/// let rows: Vec<u32> = (0..35).collect();
/// let pages = paginate(&rows, 10).unwrap();
/// let lens: Vec<usize> = pages.iter().map(|p| p.len()).collect();
/// assert_eq!(lens, vec![10, 10, 10, 5]);
/// ```
pub fn paginate<T>(items: &[T], page_size: usize) -> Result<Vec<&[T]>, ValidationError> {
    if page_size == 0 {
        return Err(ValidationError::NonPositive { name: "page size" });
    }
    Ok(items.chunks(page_size).collect())
}

/// Move `items` into consecutive owned pages of at most `page_size` items
pub fn paginate_owned<T>(items: Vec<T>, page_size: usize) -> Result<Vec<Vec<T>>, ValidationError> {
    if page_size == 0 {
        return Err(ValidationError::NonPositive { name: "page size" });
    }

    let mut pages = Vec::with_capacity(page_count(items.len(), page_size));
    let mut iter = items.into_iter();
    loop {
        let page: Vec<T> = iter.by_ref().take(page_size).collect();
        if page.is_empty() {
            break;
        }
        pages.push(page);
    }
    Ok(pages)
}
