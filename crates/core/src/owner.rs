// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner identity for the chat command router.
//!
//! The supervisor has exactly one owner, established by first contact: the
//! first chat id to send any message becomes the owner and every other chat
//! id is ignored thereafter. There is no authentication beyond this.

crate::define_id! {
    /// Internal identifier assigned to the registered owner.
    pub struct OwnerId;
}

crate::define_id! {
    /// Identifier of a chat conversation as seen by the chat transport
    /// (e.g. a Telegram chat id, rendered as a string).
    pub struct ChatId;
}

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        Self::new(value.to_string())
    }
}

/// Outcome of a message arriving from `sender` given the currently recorded
/// owner chat id, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerContact {
    /// No owner was recorded yet; `sender` becomes the owner.
    NewOwner,
    /// `sender` is the already-recorded owner.
    Owner,
    /// `sender` is not the owner; the message must be dropped.
    Ignored,
}

/// Classifies an inbound message against the current owner record.
///
/// This is the entire "first-contact-wins" rule: callers persist the new
/// owner id on [`OwnerContact::NewOwner`] and otherwise act only on
/// [`OwnerContact::Owner`].
pub fn classify_contact(current_owner: Option<&ChatId>, sender: &ChatId) -> OwnerContact {
    match current_owner {
        None => OwnerContact::NewOwner,
        Some(owner) if owner == sender => OwnerContact::Owner,
        Some(_) => OwnerContact::Ignored,
    }
}

#[cfg(test)]
#[path = "owner_tests.rs"]
mod tests;
