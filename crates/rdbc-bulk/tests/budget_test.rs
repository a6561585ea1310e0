//! Tests for rdbc-bulk budget and paginate modules

use rdbc_bulk::budget::*;
use rdbc_bulk::error::ValidationError;
use rdbc_bulk::paginate::{page_count, paginate, paginate_owned};

// ==================== Budget ====================

#[test]
fn test_known_values() {
    assert_eq!(estimate_bulk_update_fields(10, 4, 1).unwrap(), 70);
    assert_eq!(estimate_bulk_update_fields(2, 4, 1).unwrap(), 14);
    assert_eq!(max_batch_rows(10, 40).unwrap(), 16383);
    assert_eq!(estimate_insert_fields(10, 4).unwrap(), 40);
    assert_eq!(estimate_bulk_delete_fields(10, 2).unwrap(), 20);
}

#[test]
fn test_page_fits_under_ceiling() {
    for fields in 1..=12usize {
        for keys in 1..=fields {
            let rows = 50_000;
            let estimate = estimate_bulk_update_fields(rows, fields, keys).unwrap();
            let size = page_size(rows, estimate, None).unwrap();

            let per_page = estimate_bulk_update_fields(size, fields, keys).unwrap();
            assert!(
                per_page <= MAX_PLACEHOLDERS,
                "fields={} keys={} size={} needs {}",
                fields,
                keys,
                size,
                per_page
            );
        }
    }
}

#[test]
fn test_page_size_cap() {
    let estimate = estimate_insert_fields(10, 2).unwrap();
    assert_eq!(page_size(10, estimate, None).unwrap(), 32767);
    assert_eq!(page_size(10, estimate, Some(7)).unwrap(), 7);
}

#[test]
fn test_page_size_failures() {
    assert_eq!(page_size(0, 10, None), Err(ValidationError::EmptyRows));
    assert!(matches!(
        page_size(10, 0, None),
        Err(ValidationError::NonPositive { .. })
    ));
    assert!(matches!(
        page_size(1, MAX_PLACEHOLDERS * 2, None),
        Err(ValidationError::PlaceholderLimit { .. })
    ));
}

// ==================== Paginate ====================

#[test]
fn test_thirty_five_rows_by_ten() {
    let rows: Vec<u32> = (0..35).collect();
    let pages = paginate(&rows, 10).unwrap();
    let lens: Vec<usize> = pages.iter().map(|p| p.len()).collect();
    assert_eq!(lens, vec![10, 10, 10, 5]);
}

#[test]
fn test_page_count() {
    assert_eq!(page_count(35, 10), 4);
    assert_eq!(page_count(30, 10), 3);
    assert_eq!(page_count(0, 10), 0);
    assert_eq!(page_count(5, 0), 0);
}

#[test]
fn test_owned_pages_keep_order() {
    let pages = paginate_owned((0..7).collect::<Vec<u8>>(), 3).unwrap();
    assert_eq!(pages, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
}

#[test]
fn test_zero_page_size_rejected() {
    assert_eq!(
        paginate(&[1, 2], 0),
        Err(ValidationError::NonPositive { name: "page size" })
    );
}
