use anyhow::Context;
use std::sync::Arc;
use studyguard_engine::cache::CourseCache;
use studyguard_engine::collector::CollectorClient;
use studyguard_engine::config::StudyGuardConfig;
use studyguard_engine::registry::CourseRegistry;
use studyguard_engine::Course;
use tracing::debug;

pub async fn health(config: &StudyGuardConfig) -> anyhow::Result<()> {
    let client = CollectorClient::from_config(&config.collector)
        .with_context(|| format!("Invalid collector URL {}", config.collector.base_url))?;
    let connected = match client.health().await {
        Ok(ok) => ok,
        Err(e) => {
            debug!("Health check failed: {}", e);
            false
        }
    };
    println!("{}", if connected { "connected" } else { "disconnected" });
    Ok(())
}

pub async fn courses(config: &StudyGuardConfig, refresh: bool) -> anyhow::Result<()> {
    let cache = CourseCache::new(config.cache.path.clone());
    let courses = if refresh {
        let client = CollectorClient::from_config(&config.collector)
            .with_context(|| format!("Invalid collector URL {}", config.collector.base_url))?;
        CourseRegistry::new(Arc::new(client), cache).refresh().await
    } else {
        cache
            .load()
            .await
            .with_context(|| format!("Failed to read {}", cache.path().display()))?
            .unwrap_or_default()
    };

    print!("{}", render_courses(&courses));
    Ok(())
}

fn render_courses(courses: &[Course]) -> String {
    if courses.is_empty() {
        return "No courses yet. Start the collector and run `studyguard courses --refresh`.\n"
            .to_string();
    }
    courses
        .iter()
        .map(|c| format!("{}\t{}\n", c.name, c.url_pattern))
        .collect()
}
