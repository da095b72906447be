use crate::domain::error::IqmsError;
use crate::domain::model::{PageRequest, QueryItem};
use crate::domain::traits::{PageObserver, QuerySource};
use crate::infrastructure::network::retry::cancellable;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Walk an offset-paginated endpoint from offset 0 until the server says stop
///
/// One request is in flight at a time. After each page the observer is awaited
/// with the new items and everything accumulated so far, before the next
/// request goes out. The offset advances by the reported `limit`, or by the page
/// length when no limit is sent; a zero step or an offset overflow ends paging
/// with a warning.
///
/// The first failure aborts paging and is returned as-is. There is no retry here.
pub async fn fetch_paged<O>(
    source: &dyn QuerySource,
    request: &PageRequest,
    cancel: &CancellationToken,
    observer: &mut O,
) -> Result<Vec<QueryItem>, IqmsError>
where
    O: PageObserver + ?Sized,
{
    let mut accumulated: Vec<QueryItem> = Vec::new();
    let mut offset = 0usize;

    loop {
        let page = cancellable(cancel, source.fetch_page(request, offset)).await?;
        let page_len = page.items.len();
        let start = accumulated.len();
        accumulated.extend(page.items);

        debug!(
            "{}/{} offset={} got {} items (total {})",
            request.resource,
            request.key,
            offset,
            page_len,
            accumulated.len()
        );
        observer.on_page(&accumulated[start..], &accumulated).await;

        if !page.has_more {
            break;
        }

        let step = page.limit.unwrap_or(page_len);
        if step == 0 {
            warn!(
                "{}/{} reports more pages but no usable limit at offset {}; stopping",
                request.resource, request.key, offset
            );
            break;
        }
        offset = match offset.checked_add(step) {
            Some(next) => next,
            None => {
                warn!(
                    "{}/{} limit {} overflows offset {}; stopping",
                    request.resource, request.key, step, offset
                );
                break;
            }
        };
    }

    Ok(accumulated)
}
