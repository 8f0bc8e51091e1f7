//! Bounded registry of live conversations.
//!
//! Each conversation sits behind its own `tokio::sync::Mutex` so that
//! mutations of one context never block another. The map itself is a
//! `DashMap`; shard guards are released before any handle is returned.
//!
//! Capacity is enforced by evicting the least recently accessed entry, and
//! entries idle longer than the TTL are treated as deleted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::debug;

use aituber_types::chat::ConversationContext;
use aituber_types::config::ConversationConfig;

/// Shared handle to one live conversation.
pub type ConversationHandle = Arc<Mutex<ConversationContext>>;

struct ConversationSlot {
    context: ConversationHandle,
    last_access: Instant,
}

impl ConversationSlot {
    fn new(context: ConversationContext) -> Self {
        Self {
            context: Arc::new(Mutex::new(context)),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.last_access.elapsed() > ttl)
    }
}

/// Concurrent map of conversation id to context. Cloning shares the map.
#[derive(Clone)]
pub struct ConversationRegistry {
    slots: Arc<DashMap<String, ConversationSlot>>,
    max_conversations: usize,
    idle_ttl: Option<Duration>,
}

impl ConversationRegistry {
    /// `idle_ttl = None` disables expiry. A capacity of 0 is treated as 1.
    pub fn new(max_conversations: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            max_conversations: max_conversations.max(1),
            idle_ttl,
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        let ttl = (config.idle_ttl_secs > 0).then(|| Duration::from_secs(config.idle_ttl_secs));
        Self::new(config.max_conversations, ttl)
    }

    /// Look up a live conversation and refresh its access time.
    pub fn get(&self, conversation_id: &str) -> Option<ConversationHandle> {
        {
            let mut slot = self.slots.get_mut(conversation_id)?;
            if !slot.is_expired(self.idle_ttl) {
                slot.last_access = Instant::now();
                return Some(slot.context.clone());
            }
        }

        let ttl = self.idle_ttl;
        self.slots.remove_if(conversation_id, |_, slot| slot.is_expired(ttl));
        debug!(conversation_id = %conversation_id, "Conversation expired");
        None
    }

    /// Return the live conversation for `conversation_id`, or register a new
    /// one. Without an id, or with a blank one, a fresh id is generated.
    ///
    /// The returned flag is `true` when a new context was created.
    pub fn get_or_create(
        &self,
        character_id: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> (ConversationHandle, bool) {
        let conversation_id = conversation_id.filter(|id| !id.trim().is_empty());
        if let Some(existing) = conversation_id.and_then(|id| self.get(id)) {
            return (existing, false);
        }

        let context =
            ConversationContext::new(character_id, user_id, conversation_id.map(str::to_string));
        let id = context.conversation_id().to_string();

        let (handle, created) = match self.slots.entry(id.clone()) {
            // Lost a race with a concurrent creator: keep theirs unless it expired.
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(self.idle_ttl) {
                    entry.insert(ConversationSlot::new(context));
                    (entry.get().context.clone(), true)
                } else {
                    entry.get_mut().last_access = Instant::now();
                    (entry.get().context.clone(), false)
                }
            }
            Entry::Vacant(entry) => {
                let slot = entry.insert(ConversationSlot::new(context));
                (slot.context.clone(), true)
            }
        };

        if created {
            self.purge_expired();
            self.evict_over_capacity(&id);
        }
        (handle, created)
    }

    /// Remove a conversation. `false` when it was not live.
    pub fn remove(&self, conversation_id: &str) -> bool {
        self.slots.remove(conversation_id).is_some()
    }

    /// Number of registered conversations, including not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every entry idle past the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(Some(ttl)));
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            debug!(count = removed, "Expired conversations purged");
        }
        removed
    }

    fn evict_over_capacity(&self, keep: &str) {
        while self.slots.len() > self.max_conversations {
            let oldest = self
                .slots
                .iter()
                .filter(|entry| entry.key() != keep)
                .min_by_key(|entry| entry.value().last_access)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(id) => {
                    self.slots.remove(&id);
                    debug!(conversation_id = %id, "Evicted least recently used conversation");
                }
                None => break,
            }
        }
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = ConversationRegistry::default();
        let (first, created) = registry.get_or_create("hiyori", "u1", Some("conv-1"));
        assert!(created);
        let (second, created_again) = registry.get_or_create("other", "u2", Some("conv-1"));
        assert!(!created_again);
        assert!(Arc::ptr_eq(&first, &second));

        let ctx = second.lock().await;
        assert_eq!(ctx.character_id(), "hiyori");
        assert_eq!(ctx.user_id(), "u1");
    }

    #[tokio::test]
    async fn test_generated_ids_are_distinct() {
        let registry = ConversationRegistry::default();
        let (a, _) = registry.get_or_create("c", "u", None);
        let (b, _) = registry.get_or_create("c", "u", None);
        let a_id = a.lock().await.conversation_id().to_string();
        let b_id = b.lock().await.conversation_id().to_string();
        assert_ne!(a_id, b_id);
        assert!(registry.get(&a_id).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_id_gets_a_generated_one() {
        let registry = ConversationRegistry::default();
        let (empty, created) = registry.get_or_create("c", "u", Some(""));
        assert!(created);
        let (spaces, _) = registry.get_or_create("c", "u", Some("   "));

        let empty_id = empty.lock().await.conversation_id().to_string();
        let spaces_id = spaces.lock().await.conversation_id().to_string();
        assert!(!empty_id.trim().is_empty());
        assert!(!spaces_id.trim().is_empty());
        assert_ne!(empty_id, spaces_id);
        assert!(registry.get("").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove() {
        let registry = ConversationRegistry::default();
        registry.get_or_create("c", "u", Some("conv-1"));
        assert!(registry.remove("conv-1"));
        assert!(!registry.remove("conv-1"));
        assert!(registry.get("conv-1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let registry = ConversationRegistry::new(2, None);
        registry.get_or_create("c", "u", Some("a"));
        std::thread::sleep(Duration::from_millis(2));
        registry.get_or_create("c", "u", Some("b"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(registry.get("a").is_some());
        std::thread::sleep(Duration::from_millis(2));

        registry.get_or_create("c", "u", Some("c"));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
        assert!(registry.get("c").is_some());
    }

    #[test]
    fn test_idle_conversations_expire() {
        let registry = ConversationRegistry::new(10, Some(Duration::from_millis(20)));
        registry.get_or_create("c", "u", Some("idle"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(registry.get("idle").is_none());
        assert_eq!(registry.len(), 0);

        let (_, created) = registry.get_or_create("c", "u", Some("idle"));
        assert!(created);
    }

    #[test]
    fn test_zero_ttl_config_disables_expiry() {
        let config = ConversationConfig {
            idle_ttl_secs: 0,
            ..Default::default()
        };
        let registry = ConversationRegistry::from_config(&config);
        registry.get_or_create("c", "u", Some("keep"));
        assert_eq!(registry.purge_expired(), 0);
        assert!(registry.get("keep").is_some());
    }
}
