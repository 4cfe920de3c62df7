//! Provider registration and selection.

use std::sync::Arc;

use fx_types::{CurrencyProvider, ProviderSelector, ProviderType, RatesError};

/// Holds the ordered, immutable provider registration.
pub struct ProviderFactory {
    providers: Vec<Arc<dyn CurrencyProvider>>,
    span: tracing::Span,
}

impl ProviderFactory {
    /// Builds a factory from a registration that may be absent.
    ///
    /// `None` is `InvalidArgument`; an empty list is `NoProvidersRegistered`.
    pub fn try_from_registration(
        providers: Option<Vec<Arc<dyn CurrencyProvider>>>,
    ) -> Result<Self, RatesError> {
        let providers = providers.ok_or_else(|| RatesError::missing("providers"))?;
        Self::new(providers)
    }

    pub fn new(providers: Vec<Arc<dyn CurrencyProvider>>) -> Result<Self, RatesError> {
        if providers.is_empty() {
            return Err(RatesError::NoProvidersRegistered);
        }
        tracing::debug!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Provider factory initialized"
        );
        Ok(Self {
            providers,
            span: tracing::info_span!("provider_factory"),
        })
    }

    /// Parent span for selection events.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn CurrencyProvider>] {
        &self.providers
    }

    /// Providers able to serve `currency`.
    ///
    /// No per-currency routing exists yet, so this is the whole registration.
    pub fn providers_supporting(&self, currency: &str) -> Vec<Arc<dyn CurrencyProvider>> {
        let _span =
            tracing::debug_span!(parent: &self.span, "providers_supporting", currency = %currency)
                .entered();
        self.providers.clone()
    }

    fn first(&self) -> Arc<dyn CurrencyProvider> {
        Arc::clone(&self.providers[0])
    }
}

impl ProviderSelector for ProviderFactory {
    fn provider_of(
        &self,
        provider_type: ProviderType,
    ) -> Result<Arc<dyn CurrencyProvider>, RatesError> {
        let _span =
            tracing::debug_span!(parent: &self.span, "select_provider", requested = %provider_type)
                .entered();

        let Some(wanted) = provider_type.wanted_kind() else {
            return Ok(self.first());
        };

        match self.providers.iter().find(|p| p.kind() == wanted) {
            Some(provider) => Ok(Arc::clone(provider)),
            None => {
                let fallback = self.first();
                tracing::debug!(
                    "No {} provider registered, falling back to {}",
                    provider_type,
                    fallback.name()
                );
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use fx_types::{DailyRatesIter, ProviderKind, RateSnapshot};
    use rust_decimal::Decimal;

    struct Named(&'static str, ProviderKind);

    #[async_trait]
    impl CurrencyProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn kind(&self) -> ProviderKind {
            self.1
        }

        async fn get_latest(&self, _base: &str) -> Result<RateSnapshot, RatesError> {
            Ok(RateSnapshot::new())
        }

        async fn convert(
            &self,
            _base: &str,
            _targets: Option<&[String]>,
            _amount: Decimal,
        ) -> Result<RateSnapshot, RatesError> {
            Ok(RateSnapshot::new())
        }

        async fn get_historical(
            &self,
            _base: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<DailyRatesIter, RatesError> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    fn generic(name: &'static str) -> Arc<dyn CurrencyProvider> {
        Arc::new(Named(name, ProviderKind::Generic))
    }

    fn frankfurter(name: &'static str) -> Arc<dyn CurrencyProvider> {
        Arc::new(Named(name, ProviderKind::Frankfurter))
    }

    #[test]
    fn test_absent_registration_is_invalid_argument() {
        let err = ProviderFactory::try_from_registration(None).err().unwrap();
        assert!(matches!(err, RatesError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_registration_fails() {
        let err = ProviderFactory::try_from_registration(Some(vec![])).err().unwrap();
        assert_eq!(err, RatesError::NoProvidersRegistered);
    }

    #[test]
    fn test_default_is_first_registered() {
        let factory = ProviderFactory::new(vec![frankfurter("frank"), generic("b")]).unwrap();
        assert_eq!(factory.provider().unwrap().name(), "frank");

        let factory = ProviderFactory::new(vec![generic("a"), frankfurter("frank")]).unwrap();
        assert_eq!(factory.provider_of(ProviderType::Default).unwrap().name(), "a");
    }

    #[test]
    fn test_specialized_type_picks_first_match() {
        let factory = ProviderFactory::new(vec![
            generic("a"),
            frankfurter("frank-1"),
            frankfurter("frank-2"),
        ])
        .unwrap();

        let selected = factory.provider_of(ProviderType::Frankfurter).unwrap();
        assert_eq!(selected.name(), "frank-1");
    }

    #[test]
    fn test_unmatched_type_falls_back_to_first() {
        let factory = ProviderFactory::new(vec![generic("a"), generic("b")]).unwrap();

        let selected = factory.provider_of(ProviderType::Frankfurter).unwrap();
        assert_eq!(selected.name(), "a");
    }

    #[test]
    fn test_providers_supporting_returns_everything() {
        let factory = ProviderFactory::new(vec![generic("a"), generic("b")]).unwrap();

        let names: Vec<_> = factory
            .providers_supporting("JPY")
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
