//! Per-mapper result of outbound mapping

use crate::mapping::MappingFailure;
use crate::model::TopicPath;
use crate::telemetry::OutcomeKind;

/// What one mapper did with one group.
///
/// Every variant carries the topic path of the adaptable it was derived
/// from, or `None` if it was produced before adaptation.
#[derive(Debug)]
pub enum MappingOutcome<T> {
    /// The mapper produced a message.
    Mapped { value: T, topic_path: Option<TopicPath> },
    /// The mapper was skipped by its conditions or produced nothing.
    Dropped { topic_path: Option<TopicPath> },
    /// The mapper failed on this message.
    Error {
        cause: MappingFailure,
        mapper_id: String,
        topic_path: Option<TopicPath>,
    },
}

impl<T> MappingOutcome<T> {
    pub fn mapped(value: T, topic_path: Option<TopicPath>) -> Self {
        Self::Mapped { value, topic_path }
    }

    pub fn dropped(topic_path: Option<TopicPath>) -> Self {
        Self::Dropped { topic_path }
    }

    pub fn error(mapper_id: impl Into<String>, cause: MappingFailure, topic_path: Option<TopicPath>) -> Self {
        Self::Error {
            cause,
            mapper_id: mapper_id.into(),
            topic_path,
        }
    }

    pub fn topic_path(&self) -> Option<&TopicPath> {
        match self {
            Self::Mapped { topic_path, .. }
            | Self::Dropped { topic_path }
            | Self::Error { topic_path, .. } => topic_path.as_ref(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Mapped { .. } => OutcomeKind::Mapped,
            Self::Dropped { .. } => OutcomeKind::Dropped,
            Self::Error { .. } => OutcomeKind::Failed,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Mapped { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&MappingFailure> {
        match self {
            Self::Error { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Transform the mapped value, keeping the variant and topic.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MappingOutcome<U> {
        match self {
            Self::Mapped { value, topic_path } => MappingOutcome::Mapped {
                value: f(value),
                topic_path,
            },
            Self::Dropped { topic_path } => MappingOutcome::Dropped { topic_path },
            Self::Error {
                cause,
                mapper_id,
                topic_path,
            } => MappingOutcome::Error {
                cause,
                mapper_id,
                topic_path,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingError;
    use crate::model::Headers;

    fn topic() -> TopicPath {
        TopicPath {
            namespace: "ns".into(),
            entity_name: "name".into(),
            group: "things".into(),
            channel: "twin".into(),
            criterion: "events".into(),
            action: Some("modified".into()),
        }
    }

    #[test]
    fn variants_are_distinguishable() {
        let mapped = MappingOutcome::mapped(1, Some(topic()));
        let dropped: MappingOutcome<i32> = MappingOutcome::dropped(Some(topic()));
        let failed: MappingOutcome<i32> = MappingOutcome::error(
            "m1",
            MappingFailure::outbound("m1", &Headers::new(), MappingError::Internal("boom".into())),
            None,
        );

        assert!(mapped.is_mapped() && !mapped.is_dropped() && !mapped.is_error());
        assert!(dropped.is_dropped() && dropped.value().is_none());
        assert!(failed.is_error() && failed.failure().is_some());
        assert_eq!(failed.kind(), OutcomeKind::Failed);
        assert!(failed.topic_path().is_none());
        assert_eq!(dropped.topic_path(), Some(&topic()));
    }

    #[test]
    fn map_transforms_only_the_value() {
        let mapped = MappingOutcome::mapped(21, Some(topic())).map(|v| v * 2);
        assert_eq!(mapped.value(), Some(&42));
        assert_eq!(mapped.topic_path(), Some(&topic()));

        let dropped: MappingOutcome<i32> = MappingOutcome::dropped(None);
        assert!(dropped.map(|v| v.to_string()).is_dropped());
    }
}
