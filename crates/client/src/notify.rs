//! User-facing notifications.
//!
//! The reconcilers never render anything themselves. Every outcome the user
//! should see is emitted once as a [`Notice`] through the [`Notifier`] the
//! caller injected (a toast layer in a UI, stdout in the CLI).

use std::sync::{Arc, Mutex, PoisonError};

/// Language for notice texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Tr,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "tr" | "tr-tr" => Ok(Self::Tr),
            other => Err(format!("unsupported locale '{other}' (expected en or tr)")),
        }
    }
}

/// Severity used to style the notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Every message the client can show to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    SignInRequired,
    AddedToFavorites,
    RemovedFromFavorites,
    AlreadyInFavorites,
    AddedToCart,
    RemovedFromCart,
    AlreadyInCart,
    CartQuantityUpdated,
    InvalidQuantity,
    ActionFailed,
}

impl Notice {
    #[must_use]
    pub const fn level(self) -> NoticeLevel {
        match self {
            Self::AddedToFavorites
            | Self::RemovedFromFavorites
            | Self::AddedToCart
            | Self::RemovedFromCart
            | Self::CartQuantityUpdated => NoticeLevel::Success,
            Self::AlreadyInFavorites | Self::AlreadyInCart => NoticeLevel::Info,
            Self::SignInRequired | Self::InvalidQuantity | Self::ActionFailed => {
                NoticeLevel::Error
            }
        }
    }

    /// Localized text.
    #[must_use]
    pub const fn message(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::SignInRequired, Locale::En) => "Please sign in to continue.",
            (Self::SignInRequired, Locale::Tr) => "Devam etmek için lütfen giriş yapın.",
            (Self::AddedToFavorites, Locale::En) => "Added to your favorites.",
            (Self::AddedToFavorites, Locale::Tr) => "Favorilerinize eklendi.",
            (Self::RemovedFromFavorites, Locale::En) => "Removed from your favorites.",
            (Self::RemovedFromFavorites, Locale::Tr) => "Favorilerinizden çıkarıldı.",
            (Self::AlreadyInFavorites, Locale::En) => "This product is already in your favorites.",
            (Self::AlreadyInFavorites, Locale::Tr) => "Bu ürün zaten favorilerinizde.",
            (Self::AddedToCart, Locale::En) => "Added to your cart.",
            (Self::AddedToCart, Locale::Tr) => "Sepetinize eklendi.",
            (Self::RemovedFromCart, Locale::En) => "Removed from your cart.",
            (Self::RemovedFromCart, Locale::Tr) => "Sepetinizden çıkarıldı.",
            (Self::AlreadyInCart, Locale::En) => "This product is already in your cart.",
            (Self::AlreadyInCart, Locale::Tr) => "Bu ürün zaten sepetinizde.",
            (Self::CartQuantityUpdated, Locale::En) => "Cart updated.",
            (Self::CartQuantityUpdated, Locale::Tr) => "Sepet güncellendi.",
            (Self::InvalidQuantity, Locale::En) => "Please choose a valid quantity.",
            (Self::InvalidQuantity, Locale::Tr) => "Lütfen geçerli bir adet seçin.",
            (Self::ActionFailed, Locale::En) => "Something went wrong. Please try again.",
            (Self::ActionFailed, Locale::Tr) => "Bir hata oluştu. Lütfen tekrar deneyin.",
        }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier {
    locale: Locale,
}

impl TracingNotifier {
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let message = notice.message(self.locale);
        match notice.level() {
            NoticeLevel::Error => tracing::warn!(?notice, "{message}"),
            NoticeLevel::Success | NoticeLevel::Info => tracing::info!(?notice, "{message}"),
        }
    }
}

/// Keeps every notice in memory.
///
/// Clones share the same buffer, so a clone can be handed to a reconciler
/// while the original is inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far, oldest first.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return all notices received so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
