use crate::{
    client::MessagingClient,
    domain::{Chat, MessageId},
    errors::Error,
    guard::RateLimitGuard,
    Result,
};

/// Largest page the author-scoped search endpoint returns atomically.
pub const MAX_SEARCH_PAGE: usize = 100;

/// Search page size, validated to `1..=MAX_SEARCH_PAGE` at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSize(usize);

impl PageSize {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::Config(
                "search page size must be greater than 0".to_string(),
            ));
        }
        if n > MAX_SEARCH_PAGE {
            return Err(Error::Config(format!(
                "search page size {n} exceeds the search endpoint maximum of {MAX_SEARCH_PAGE}"
            )));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(MAX_SEARCH_PAGE)
    }
}

/// Enumerates every message the current user authored in a chat.
pub struct MessageLocator<'a> {
    client: &'a dyn MessagingClient,
    guard: &'a RateLimitGuard,
    page_size: PageSize,
}

impl<'a> MessageLocator<'a> {
    pub fn new(
        client: &'a dyn MessagingClient,
        guard: &'a RateLimitGuard,
        page_size: PageSize,
    ) -> Self {
        Self {
            client,
            guard,
            page_size,
        }
    }

    /// Page through the search until a short page comes back.
    ///
    /// The offset always advances by the page size, so a full last page costs
    /// one extra (empty) round trip.
    pub async fn locate(&self, chat: &Chat) -> Result<Vec<MessageId>> {
        let limit = self.page_size.get();
        let mut found = Vec::new();
        let mut offset = 0usize;

        loop {
            tracing::debug!(chat = %chat.title, offset, "searching own messages");
            let page = self
                .guard
                .call("search", || {
                    self.client.search_own_messages(chat.id, offset, limit)
                })
                .await?;

            let page_len = page.len();
            found.extend(page);
            tracing::info!(
                chat = %chat.title,
                found = found.len(),
                "found {} of your messages in \"{}\"",
                found.len(),
                chat.title
            );

            if page_len < limit {
                return Ok(found);
            }
            offset += limit;
        }
    }
}
