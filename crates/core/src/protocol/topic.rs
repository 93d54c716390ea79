//! Logical Bus Topics
//!
//! - [`COMMAND_TOPIC`]: shared by every state; receivers filter by target
//! - `exec_response/<StateId>`: one transition topic per sending state,
//!   read by the executor
//! - [`STATUS_TOPIC`]: vehicle mode/arm tokens for the status consumer

use heapless::String;

use super::state::StateId;

/// Command topic shared by all states
pub const COMMAND_TOPIC: &str = "state_cmd";

/// Prefix of the per-state transition topics
pub const TRANSITION_TOPIC_PREFIX: &str = "exec_response/";

/// Vehicle status token topic
pub const STATUS_TOPIC: &str = "play";

/// Topic name capacity
pub const TOPIC_CAPACITY: usize = 64;

/// Topic name
pub type TopicString = String<TOPIC_CAPACITY>;

/// Transition topic a state publishes its TransitionEnvelopes on
pub fn transition_topic(state: StateId) -> TopicString {
    let mut topic = TopicString::new();
    // Prefix plus the longest state name is well under capacity.
    let _ = topic.push_str(TRANSITION_TOPIC_PREFIX);
    let _ = topic.push_str(state.name());
    topic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_topic_name() {
        assert_eq!(
            transition_topic(StateId::FollowWaypoint).as_str(),
            "exec_response/FollowWaypoint"
        );
    }

    #[test]
    fn test_transition_topics_are_distinct() {
        let a = transition_topic(StateId::FollowWaypoint);
        let b = transition_topic(StateId::AvoidObstacle);
        assert_ne!(a, b);
        assert_ne!(a.as_str(), COMMAND_TOPIC);
    }
}
