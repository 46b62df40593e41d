//!
//! src/engine.rs  Andrew Belles  Oct 9th, 2026
//!
//! Read operations the request layer calls, one per chart, plus the
//! proactive refresh the hourly trigger calls
//!

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheCoordinator;
use crate::config::AppConfig;
use crate::errors::ChartError;
use crate::fetch::Fetcher;
use crate::filter;
use crate::flo::FloChart;
use crate::genie::GenieChart;
use crate::lookup::Lookups;
use crate::melon::MelonChart;
use crate::types::ChartEntry;

pub struct ChartEngine {
    flo: CacheCoordinator,
    genie: GenieChart,
    melon: MelonChart,
    lookups: Lookups
}

impl ChartEngine {
    pub fn new(cfg: &AppConfig) -> Result<Self, ChartError> {
        let fetcher = Arc::new(Fetcher::new(&cfg.http)?);
        let sources = &cfg.sources;

        let flo = FloChart::new(fetcher.clone(), sources.flo_chart.clone());
        Ok( Self::from_parts(
            CacheCoordinator::new(Arc::new(flo), cfg.cache.refresh_interval),
            GenieChart::new(fetcher.clone(), sources.genie_chart.clone()),
            MelonChart::new(
                fetcher.clone(),
                sources.melon_chart.clone(),
                sources.melon_hot100.clone()
            ),
            Lookups::new(fetcher, sources.melon_base.clone(), sources.genie_base.clone())
        ))
    }

    pub fn from_parts(
        flo: CacheCoordinator,
        genie: GenieChart,
        melon: MelonChart,
        lookups: Lookups
    ) -> Self {
        Self { flo, genie, melon, lookups }
    }

    /// FLO top 100 from the shared cache, filtered after retrieval.
    pub async fn flo_chart(&self, artist: Option<&str>) -> Result<Vec<ChartEntry>, ChartError> {
        let snapshot = self.flo.get_or_refresh().await?;
        Ok(filter::by_artist(snapshot.entries(), artist))
    }

    /// Genie top 200, scraped on every call.
    pub async fn genie_chart(&self, artist: Option<&str>) -> Result<Vec<ChartEntry>, ChartError> {
        self.genie.top200(artist).await
    }

    /// Melon top 100, scraped on every call.
    pub async fn melon_chart(&self, artist: Option<&str>) -> Result<Vec<ChartEntry>, ChartError> {
        self.melon.top100(artist).await
    }

    /// Melon hot 100; `mode` is "D30" or anything else for D100.
    pub async fn melon_hot100(&self, mode: &str, artist: Option<&str>) ->
        Result<Vec<ChartEntry>, ChartError> {
        self.melon.hot100(mode, artist).await
    }

    /// Hourly trigger entry point. Failures are logged here and never
    /// reach chart readers.
    pub async fn scheduled_refresh(&self) {
        match self.flo.refresh().await {
            Ok(snapshot) => info!(
                entries = snapshot.entries().len(), "chart.scheduled.done"
            ),
            Err(e) => warn!(error = %e, "chart.scheduled.failed")
        }
    }

    pub fn lookups(&self) -> &Lookups { &self.lookups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::cache::ChartSource;
    use crate::config::{self, SourcesConfig};
    use crate::types::RankStatus;

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    struct FixedChart {
        calls: AtomicUsize,
        fail: bool
    }

    #[async_trait]
    impl ChartSource for FixedChart {
        fn name(&self) -> &'static str { "fixed" }

        async fn fetch_chart(&self) -> Result<Vec<ChartEntry>, ChartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ChartError::Status { url: "https://flo".into(), status: 503 });
            }
            Ok(["NewJeans", "aespa", "IU, NewJeans"].iter().enumerate()
                .map(|(i, artist)| ChartEntry {
                    rank: i as u32 + 1,
                    artist_name: Some(artist.to_string()),
                    title: format!("track {}", i + 1),
                    album_name: String::new(),
                    album_art: None,
                    song_id: Some(i.to_string()),
                    rank_status: RankStatus::Static,
                    changed_rank: 0
                })
                .collect())
        }
    }

    fn engine(source: Arc<FixedChart>) -> ChartEngine {
        let fetcher = Arc::new(Fetcher::new(&config::HttpConfig::default()).unwrap());
        let s = SourcesConfig::default();
        ChartEngine::from_parts(
            CacheCoordinator::new(source, Duration::from_secs(3600)),
            GenieChart::new(fetcher.clone(), s.genie_chart),
            MelonChart::new(fetcher.clone(), s.melon_chart, s.melon_hot100),
            Lookups::new(fetcher, s.melon_base, s.genie_base)
        )
    }

    #[tokio::test]
    async fn flo_reads_filter_after_the_cache() {
        let source = Arc::new(FixedChart { calls: AtomicUsize::new(0), fail: false });
        let engine = engine(source.clone());

        let all = engine.flo_chart(None).await.unwrap();
        let some = engine.flo_chart(Some(" NewJeans ")).await.unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(some.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.flo.snapshot().entries().len(), 3);
    }

    #[tokio::test]
    async fn scheduled_refresh_swallows_failures() {
        let source = Arc::new(FixedChart { calls: AtomicUsize::new(0), fail: true });
        let engine = engine(source.clone());

        engine.scheduled_refresh().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(!engine.flo.snapshot().is_populated());
        assert!(engine.flo_chart(None).await.is_err());
    }

    #[tokio::test]
    #[allow(dead_code)]
    async fn live_charts_testbench() -> Result<(), ChartError> {
        dotenvy::dotenv().ok();

        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = config::load_config()?;
        let engine = ChartEngine::new(&cfgs)?;

        let flo = engine.flo_chart(None).await?;
        println!("flo: {} entries, first {:?}", flo.len(), flo.first());
        assert!(!flo.is_empty());

        let genie = engine.genie_chart(None).await?;
        println!("genie: {} entries, first {:?}", genie.len(), genie.first());

        let melon = engine.melon_chart(None).await?;
        println!("melon: {} entries, first {:?}", melon.len(), melon.first());

        let hot = engine.melon_hot100("D30", None).await?;
        println!("melon hot100 D30: {} entries", hot.len());

        let albums = engine.lookups().melon_albums("aespa").await?;
        println!("melon albums: {}", serde_json::to_string_pretty(&albums)?);

        Ok(())
    }
}
