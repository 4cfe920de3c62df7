//! CachedRateService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use fx_types::{
        CurrencyProvider, DailyRates, DailyRatesIter, ProviderKind, ProviderSelector,
        ProviderType, RateSnapshot, RatesError,
    };

    use crate::{CacheTtls, CachedRateService, ProviderFactory};

    /// Scripted provider that counts every call it receives.
    pub struct FakeProvider {
        name: &'static str,
        kind: ProviderKind,
        delay: Duration,
        failure: Mutex<Option<RatesError>>,
        pub latest_calls: AtomicUsize,
        pub convert_calls: AtomicUsize,
        pub history_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                kind: ProviderKind::Generic,
                delay: Duration::ZERO,
                failure: Mutex::new(None),
                latest_calls: AtomicUsize::new(0),
                convert_calls: AtomicUsize::new(0),
                history_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_kind(mut self, kind: ProviderKind) -> Self {
            self.kind = kind;
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Fails the next call with `err`.
        pub fn fail_next(&self, err: RatesError) {
            *self.failure.lock().unwrap() = Some(err);
        }

        pub fn total_calls(&self) -> usize {
            self.latest_calls.load(Ordering::SeqCst)
                + self.convert_calls.load(Ordering::SeqCst)
                + self.history_calls.load(Ordering::SeqCst)
        }

        async fn enter(&self, counter: &AtomicUsize) -> Result<(), RatesError> {
            counter.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.failure.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl CurrencyProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn get_latest(&self, base: &str) -> Result<RateSnapshot, RatesError> {
            self.enter(&self.latest_calls).await?;
            let n = self.latest_calls.load(Ordering::SeqCst);
            Ok(RateSnapshot::from([
                ("EUR".to_string(), dec!(0.9)),
                (format!("{}-{}", base, self.name), Decimal::from(n)),
            ]))
        }

        async fn convert(
            &self,
            _base: &str,
            targets: Option<&[String]>,
            amount: Decimal,
        ) -> Result<RateSnapshot, RatesError> {
            let targets = targets.ok_or_else(|| RatesError::missing("targets"))?;
            self.enter(&self.convert_calls).await?;
            Ok(targets
                .iter()
                .map(|t| (t.clone(), amount * dec!(2)))
                .collect())
        }

        async fn get_historical(
            &self,
            _base: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<DailyRatesIter, RatesError> {
            self.enter(&self.history_calls).await?;
            let days = start
                .iter_days()
                .take_while(move |d| *d <= end)
                .map(|d| DailyRates::new(d, RateSnapshot::from([("USD".to_string(), dec!(1.1))])));
            Ok(Box::new(days))
        }
    }

    /// Wraps a factory and counts selections.
    struct CountingSelector {
        inner: ProviderFactory,
        selections: Arc<AtomicUsize>,
    }

    impl ProviderSelector for CountingSelector {
        fn provider_of(
            &self,
            provider_type: ProviderType,
        ) -> Result<Arc<dyn CurrencyProvider>, RatesError> {
            self.selections.fetch_add(1, Ordering::SeqCst);
            self.inner.provider_of(provider_type)
        }
    }

    /// Selector whose configuration is broken.
    struct BrokenSelector;

    impl ProviderSelector for BrokenSelector {
        fn provider_of(&self, _: ProviderType) -> Result<Arc<dyn CurrencyProvider>, RatesError> {
            Err(RatesError::NoProvidersRegistered)
        }
    }

    fn registered(provider: &Arc<FakeProvider>) -> Arc<dyn CurrencyProvider> {
        provider.clone()
    }

    fn service_with(
        provider: Arc<FakeProvider>,
        ttls: CacheTtls,
    ) -> CachedRateService<ProviderFactory> {
        let factory = ProviderFactory::new(vec![registered(&provider)]).unwrap();
        CachedRateService::new(factory, ttls)
    }

    fn service(provider: Arc<FakeProvider>) -> CachedRateService<ProviderFactory> {
        service_with(provider, CacheTtls::default())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strings(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read-through behaviour
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_repeated_latest_hits_provider_once() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        let first = svc.get_latest("USD").await.unwrap();
        let second = svc.get_latest("USD").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_selection() {
        let provider: Arc<dyn CurrencyProvider> = Arc::new(FakeProvider::new("a"));
        let selections = Arc::new(AtomicUsize::new(0));
        let selector = CountingSelector {
            inner: ProviderFactory::new(vec![provider]).unwrap(),
            selections: selections.clone(),
        };
        let svc = CachedRateService::new(selector, CacheTtls::default());

        svc.get_latest("USD").await.unwrap();
        svc.get_latest("USD").await.unwrap();

        assert_eq!(selections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let provider = Arc::new(FakeProvider::new("a"));
        let ttls = CacheTtls {
            latest: Duration::from_millis(100),
            ..CacheTtls::default()
        };
        let svc = service_with(provider.clone(), ttls);

        let first = svc.get_latest("USD").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let second = svc.get_latest("USD").await.unwrap();

        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 2);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_ttls_are_independent_per_operation() {
        let provider = Arc::new(FakeProvider::new("a"));
        let ttls = CacheTtls {
            latest: Duration::from_millis(100),
            ..CacheTtls::default()
        };
        let svc = service_with(provider.clone(), ttls);
        let targets = strings(&["EUR"]);

        svc.get_latest("USD").await.unwrap();
        svc.convert("USD", Some(targets.as_slice()), dec!(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        svc.get_latest("USD").await.unwrap();
        svc.convert("USD", Some(targets.as_slice()), dec!(10)).await.unwrap();

        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.convert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_base_code_case_shares_entry() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        svc.get_latest("usd").await.unwrap();
        svc.get_latest(" USD ").await.unwrap();

        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 1);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Key separation
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_different_targets_never_share_entry() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let eur = strings(&["EUR"]);
        let gbp = strings(&["GBP"]);

        let to_eur = svc.convert("USD", Some(eur.as_slice()), dec!(100)).await.unwrap();
        let to_gbp = svc.convert("USD", Some(gbp.as_slice()), dec!(100)).await.unwrap();

        assert_eq!(provider.convert_calls.load(Ordering::SeqCst), 2);
        assert!(to_eur.contains_key("EUR"));
        assert!(to_gbp.contains_key("GBP"));
    }

    #[tokio::test]
    async fn test_target_order_does_not_split_cache_entries() {
        // Same set of targets in a different order is the same conversion.
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let forward = strings(&["EUR", "GBP"]);
        let reversed = strings(&["GBP", "EUR"]);

        let a = svc.convert("USD", Some(forward.as_slice()), dec!(100)).await.unwrap();
        let b = svc.convert("USD", Some(reversed.as_slice()), dec!(100)).await.unwrap();

        assert_eq!(provider.convert_calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_amount_scale_does_not_split_entries() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let eur = strings(&["EUR"]);

        svc.convert("USD", Some(eur.as_slice()), dec!(100)).await.unwrap();
        svc.convert("USD", Some(eur.as_slice()), dec!(100.00)).await.unwrap();
        svc.convert("USD", Some(eur.as_slice()), dec!(100.01)).await.unwrap();

        assert_eq!(provider.convert_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_date_ranges_do_not_collide() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        svc.get_historical("USD", day(2024, 1, 1), day(2024, 1, 5)).await.unwrap();
        svc.get_historical("USD", day(2024, 1, 1), day(2024, 1, 6)).await.unwrap();
        svc.get_historical("EUR", day(2024, 1, 1), day(2024, 1, 5)).await.unwrap();
        svc.get_historical("USD", day(2024, 1, 1), day(2024, 1, 5)).await.unwrap();

        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 3);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Argument checks
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_arguments_never_reach_provider() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let eur = strings(&["EUR"]);

        let errors = vec![
            svc.get_latest("").await.unwrap_err(),
            svc.get_latest("   ").await.unwrap_err(),
            svc.convert("", Some(eur.as_slice()), dec!(1)).await.unwrap_err(),
            svc.convert("USD", None, dec!(1)).await.unwrap_err(),
            svc.get_historical("", day(2024, 1, 1), day(2024, 1, 2))
                .await
                .unwrap_err(),
        ];

        for err in errors {
            assert!(matches!(err, RatesError::InvalidArgument(_)), "got {:?}", err);
        }
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        let err = svc
            .get_historical("USD", day(2024, 2, 1), day(2024, 1, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, RatesError::InvalidArgument(_)));
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_targets_yield_empty_snapshot() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        let result = svc.convert("USD", Some(&[] as &[String]), dec!(5)).await.unwrap();
        assert!(result.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Failures
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_upstream_failure_propagates_and_is_not_cached() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let original = RatesError::UpstreamUnavailable("frankfurter returned 503".into());
        provider.fail_next(original.clone());

        let err = svc
            .get_historical("USD", day(2024, 1, 1), day(2024, 1, 3))
            .await
            .unwrap_err();
        assert_eq!(err, original);

        let series = svc
            .get_historical("USD", day(2024, 1, 1), day(2024, 1, 3))
            .await
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_propagates_unchanged() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());
        let original = RatesError::UpstreamMalformedResponse("missing rates".into());
        provider.fail_next(original.clone());

        assert_eq!(svc.get_latest("USD").await.unwrap_err(), original);
    }

    #[tokio::test]
    async fn test_selection_failure_propagates() {
        let svc = CachedRateService::new(BrokenSelector, CacheTtls::default());
        assert_eq!(
            svc.get_latest("USD").await.unwrap_err(),
            RatesError::NoProvidersRegistered
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Materialization & selection
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_lazy_series_is_materialized_once() {
        let provider = Arc::new(FakeProvider::new("a"));
        let svc = service(provider.clone());

        let first = svc
            .get_historical("USD", day(2024, 3, 1), day(2024, 3, 10))
            .await
            .unwrap();
        let second = svc
            .get_historical("USD", day(2024, 3, 1), day(2024, 3, 10))
            .await
            .unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        assert_eq!(second[9].date, day(2024, 3, 10));
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preferred_type_falls_back_to_first_provider() {
        let a = Arc::new(FakeProvider::new("a"));
        let b = Arc::new(FakeProvider::new("b"));
        let factory = ProviderFactory::new(vec![registered(&a), registered(&b)]).unwrap();
        let svc = CachedRateService::new(factory, CacheTtls::default())
            .with_preferred(ProviderType::Frankfurter);

        svc.get_latest("USD").await.unwrap();

        assert_eq!(a.total_calls(), 1);
        assert_eq!(b.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_preferred_type_selects_matching_provider() {
        let a = Arc::new(FakeProvider::new("a"));
        let frank = Arc::new(FakeProvider::new("frank").with_kind(ProviderKind::Frankfurter));
        let factory = ProviderFactory::new(vec![registered(&a), registered(&frank)]).unwrap();
        let svc = CachedRateService::new(factory, CacheTtls::default())
            .with_preferred(ProviderType::Frankfurter);

        let rates = svc.get_latest("USD").await.unwrap();

        assert!(rates.contains_key("USD-frank"));
        assert_eq!(a.total_calls(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Concurrency
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_coalesce() {
        let provider = Arc::new(FakeProvider::new("a").with_delay(Duration::from_millis(100)));
        let svc = Arc::new(service(provider.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let svc = svc.clone();
            tasks.spawn(async move { svc.get_latest("USD").await });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.unwrap().unwrap());
        }

        assert_eq!(results.len(), 16);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_waiters_share_failure() {
        let provider = Arc::new(FakeProvider::new("a").with_delay(Duration::from_millis(100)));
        provider.fail_next(RatesError::UpstreamUnavailable("down".into()));
        let svc = Arc::new(service(provider.clone()));

        let (left, right) = tokio::join!(svc.get_latest("USD"), svc.get_latest("USD"));

        assert_eq!(left.unwrap_err(), RatesError::UpstreamUnavailable("down".into()));
        assert_eq!(right.unwrap_err(), RatesError::UpstreamUnavailable("down".into()));
        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_population() {
        let provider = Arc::new(FakeProvider::new("a").with_delay(Duration::from_millis(100)));
        let svc = service(provider.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), svc.get_latest("USD")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        svc.get_latest("USD").await.unwrap();

        assert_eq!(provider.latest_calls.load(Ordering::SeqCst), 1);
    }
}
