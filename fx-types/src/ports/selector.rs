//! Provider selection port.

use std::sync::Arc;

use crate::domain::ProviderType;
use crate::error::RatesError;
use crate::ports::CurrencyProvider;

/// Picks the provider that serves a request.
///
/// Selection is synchronous. The cached rate service depends on this trait
/// rather than on the concrete factory, so tests can substitute their own.
pub trait ProviderSelector: Send + Sync + 'static {
    /// The provider for `provider_type`.
    fn provider_of(
        &self,
        provider_type: ProviderType,
    ) -> Result<Arc<dyn CurrencyProvider>, RatesError>;

    /// The default provider.
    fn provider(&self) -> Result<Arc<dyn CurrencyProvider>, RatesError> {
        self.provider_of(ProviderType::Default)
    }
}
