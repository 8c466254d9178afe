use std::sync::Arc;
use std::time::Duration;

use domain::ItemId;
use domain::Quality;
use domain::Variants;
use use_cases::interactors::resolver::SourceResolver;
use use_cases::models::descriptors::ScrollDirection;
use use_cases::services::cache::SourceCache;
use use_cases::settings::EngineSettings;

mod fixtures;

use fixtures::item;
use fixtures::Answer;
use fixtures::CountingOptimizer;
use fixtures::Engine;

fn resolver(optimizer: &Arc<CountingOptimizer>) -> Arc<SourceResolver> {
    let cache = Arc::new(SourceCache::new(8, Duration::from_secs(60)));

    Arc::new(SourceResolver::new(cache, optimizer.clone(), Duration::from_secs(1)))
}

fn variants() -> Variants {
    [(Quality::P720, "a-720.mp4"), (Quality::Auto, "a.m3u8")].into_iter().collect()
}

#[tokio::test(start_paused = true)]
async fn slow_optimizer_settles_on_direct_rendition_within_budget() {
    let optimizer = Arc::new(CountingOptimizer::new(Duration::from_secs(30), Answer::Optimized));
    let resolver = resolver(&optimizer);

    let started = tokio::time::Instant::now();
    let uri = resolver.clone().resolve("a".into(), &variants(), Quality::P720).await;

    assert_eq!(uri.as_deref(), Some("a-720.mp4"));
    assert!(started.elapsed() <= Duration::from_millis(1_050));
    assert!(resolver.is_cached(&"a".into(), Quality::P720).await);
}

#[tokio::test(start_paused = true)]
async fn optimized_location_is_preferred_when_in_time() {
    let optimizer = Arc::new(CountingOptimizer::new(Duration::from_millis(200), Answer::Optimized));
    let resolver = resolver(&optimizer);

    let uri = resolver.clone().resolve("a".into(), &variants(), Quality::P720).await;

    assert_eq!(uri.as_deref(), Some("cdn://a-720.mp4"));
}

#[rstest::rstest]
#[case(Answer::Fail)]
#[case(Answer::Empty)]
#[tokio::test]
async fn failed_optimization_falls_back_and_is_cached(#[case] answer: Answer) {
    let optimizer = Arc::new(CountingOptimizer::new(Duration::ZERO, answer));
    let resolver = resolver(&optimizer);

    let first = resolver.clone().resolve("a".into(), &variants(), Quality::Auto).await;
    let second = resolver.clone().resolve("a".into(), &variants(), Quality::Auto).await;

    assert_eq!(first.as_deref(), Some("a.m3u8"));
    assert_eq!(first, second);
    assert_eq!(optimizer.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_resolutions_share_one_attempt() {
    let optimizer = Arc::new(CountingOptimizer::new(Duration::from_millis(300), Answer::Optimized));
    let resolver = resolver(&optimizer);
    let variants = variants();

    let (first, second) = tokio::join!(
        resolver.clone().resolve("a".into(), &variants, Quality::P720),
        resolver.clone().resolve("a".into(), &variants, Quality::P720),
    );

    assert_eq!(first.as_deref(), Some("cdn://a-720.mp4"));
    assert_eq!(first, second);
    assert_eq!(optimizer.calls(), 1);
}

#[tokio::test]
async fn missing_quality_resolves_to_master_rendition() {
    let optimizer = Arc::new(CountingOptimizer::failing());
    let resolver = resolver(&optimizer);
    let variants: Variants = [(Quality::Auto, "a.mp4")].into_iter().collect();

    let uri = resolver.clone().resolve("a".into(), &variants, Quality::P720).await;

    assert_eq!(uri.as_deref(), Some("a.mp4"));
    assert_eq!(optimizer.requests.lock().unwrap()[0].2, "a.mp4");
}

#[tokio::test]
async fn item_without_renditions_never_reaches_the_optimizer() {
    let optimizer = Arc::new(CountingOptimizer::failing());
    let resolver = resolver(&optimizer);
    let variants: Variants = [(Quality::P720, " "), (Quality::Auto, "")].into_iter().collect();

    assert_eq!(resolver.clone().resolve("a".into(), &variants, Quality::P720).await, None);
    assert_eq!(optimizer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn prefetch_dedups_in_flight_and_skips_cached_items() {
    let settings = EngineSettings { prefetch_ahead: 2, ..Default::default() };
    let optimizer = CountingOptimizer::new(Duration::from_millis(100), Answer::Optimized);
    let engine = Engine::with(vec![item("a"), item("b"), item("c"), item("d")], settings, optimizer).await;

    let scheduled = engine.prefetcher.clone().schedule(0, ScrollDirection::Forward).await;
    let ids = scheduled.iter().map(|prefetch| prefetch.item_id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, vec![ItemId::from("b"), ItemId::from("c")]);

    assert!(engine.prefetcher.clone().schedule(0, ScrollDirection::Forward).await.is_empty());

    for prefetch in scheduled {
        prefetch.task.await.unwrap();
    }

    assert!(engine.prefetcher.clone().schedule(0, ScrollDirection::Forward).await.is_empty());
    assert_eq!(engine.optimizer.calls(), 2);
    assert!(engine.resolver.is_cached(&"c".into(), Quality::Auto).await);
}

#[tokio::test(start_paused = true)]
async fn prefetch_follows_backward_scrolling() {
    let engine = Engine::new(vec![item("a"), item("b"), item("c"), item("d")]).await;

    let scheduled = engine.prefetcher.clone().schedule(3, ScrollDirection::Backward).await;
    let ids = scheduled.iter().map(|prefetch| prefetch.item_id.clone()).collect::<Vec<_>>();

    assert_eq!(ids, vec![ItemId::from("c"), ItemId::from("b")]);
}
