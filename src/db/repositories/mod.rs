pub mod ingredient;
pub mod recipe;
pub mod recipe_list;
pub mod shopping;
pub mod subscription;
pub mod tag;
pub mod user;

/// Zero-based page index for sea-orm's paginator; fails when the row offset
/// would overflow.
pub(crate) fn page_index(page: u64, page_size: u64) -> anyhow::Result<u64> {
    let index = page.saturating_sub(1);
    index
        .checked_mul(page_size)
        .ok_or_else(|| anyhow::anyhow!("Page {page} is out of range"))?;
    Ok(index)
}
