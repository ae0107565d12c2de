use crate::cache::CourseCache;
use crate::collector::CourseSource;
use std::sync::{Arc, PoisonError, RwLock};
use studyguard_common::Course;
use studyguard_common::pattern::CoursePattern;
use tracing::{debug, info, warn};

/// A course together with its compiled URL pattern.
#[derive(Debug, Clone)]
pub struct CompiledCourse {
    pub course: Course,
    /// `None` when the pattern could not be compiled; such a course never matches.
    pattern: Option<CoursePattern>,
}

impl CompiledCourse {
    pub fn compile(course: Course) -> Self {
        let pattern = match CoursePattern::compile(&course.url_pattern) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Course {} will never match: {}", course.id, e);
                None
            }
        };
        Self { course, pattern }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(url))
    }
}

/// Holds the current course list.
///
/// Readers take a cheap snapshot of the list and never wait on a refresh in
/// flight; a successful refresh swaps the whole list in one write.
pub struct CourseRegistry {
    source: Arc<dyn CourseSource>,
    cache: CourseCache,
    courses: RwLock<Arc<[CompiledCourse]>>,
}

impl CourseRegistry {
    pub fn new(source: Arc<dyn CourseSource>, cache: CourseCache) -> Self {
        Self {
            source,
            cache,
            courses: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn snapshot(&self) -> Arc<[CompiledCourse]> {
        self.courses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> Vec<Course> {
        self.snapshot()
            .iter()
            .map(|compiled| compiled.course.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// First course, in registry order, whose pattern matches `url`.
    pub fn match_first(&self, url: &str) -> Option<Course> {
        self.snapshot()
            .iter()
            .find(|compiled| compiled.matches(url))
            .map(|compiled| compiled.course.clone())
    }

    fn replace(&self, courses: Vec<Course>) {
        let compiled: Arc<[CompiledCourse]> =
            courses.into_iter().map(CompiledCourse::compile).collect();
        *self.courses.write().unwrap_or_else(PoisonError::into_inner) = compiled;
    }

    /// Swap in `courses` only if nothing else filled the list meanwhile.
    fn replace_if_empty(&self, courses: Vec<Course>) -> bool {
        let compiled: Arc<[CompiledCourse]> =
            courses.into_iter().map(CompiledCourse::compile).collect();
        let mut current = self.courses.write().unwrap_or_else(PoisonError::into_inner);
        if !current.is_empty() {
            return false;
        }
        *current = compiled;
        true
    }

    /// Fetch the course list from the collector.
    ///
    /// On success the list is swapped in and written to the cache. On failure
    /// a populated list is left alone; an empty one is seeded from the cache.
    pub async fn refresh(&self) -> Vec<Course> {
        match self.source.fetch_courses().await {
            Ok(courses) => {
                info!("Course list updated: {} courses", courses.len());
                self.replace(courses.clone());
                if let Err(e) = self.cache.store(&courses).await {
                    warn!(
                        "Failed to write course cache {}: {}",
                        self.cache.path().display(),
                        e
                    );
                }
            }
            Err(e) => {
                warn!("Failed to fetch courses: {}", e);
                if self.is_empty() {
                    self.load_cached().await;
                } else {
                    debug!("Keeping the current course list");
                }
            }
        }
        self.current()
    }

    async fn load_cached(&self) {
        match self.cache.load().await {
            Ok(Some(courses)) => {
                let count = courses.len();
                if self.replace_if_empty(courses) {
                    info!("Loaded {} courses from cache", count);
                } else {
                    debug!("Course list filled while reading the cache, discarding cached copy");
                }
            }
            Ok(None) => info!("No cached course list available"),
            Err(e) => warn!(
                "Failed to read course cache {}: {}",
                self.cache.path().display(),
                e
            ),
        }
    }
}

