// Trade status transition policy.

use serde::Deserialize;
use thiserror::Error;

use crate::models::TradeStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TradeError {
    #[error("illegal trade transition for `{id}`: {} -> {to}", .from.map_or("none", |s| s.as_str()))]
    IllegalTransition {
        id: String,
        from: Option<TradeStatus>,
        to: TradeStatus,
    },
}

/// Whether the store checks status transitions.
///
/// `Permissive` accepts any status for any id, the way the web client
/// always behaved. `Strict` walks the active -> requested -> accepted ->
/// completed ladder, with cancellation back to active allowed before
/// completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradePolicy {
    #[default]
    Permissive,
    Strict,
}

impl TradePolicy {
    pub fn allows(&self, from: Option<TradeStatus>, to: TradeStatus) -> bool {
        match self {
            TradePolicy::Permissive => true,
            TradePolicy::Strict => is_forward_step(from, to),
        }
    }

    /// Check a transition, producing a typed error when it is rejected.
    pub fn check(
        &self,
        id: &str,
        from: Option<TradeStatus>,
        to: TradeStatus,
    ) -> Result<(), TradeError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(TradeError::IllegalTransition {
                id: id.to_string(),
                from,
                to,
            })
        }
    }
}

fn is_forward_step(from: Option<TradeStatus>, to: TradeStatus) -> bool {
    use TradeStatus::*;
    matches!(
        (from, to),
        (None | Some(Active), Requested)
            | (Some(Requested), Accepted)
            | (Some(Accepted), Completed)
            | (Some(Requested | Accepted), Active)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use TradeStatus::*;

    #[test]
    fn permissive_accepts_anything() {
        let p = TradePolicy::Permissive;
        assert!(p.allows(None, Completed));
        assert!(p.allows(Some(Completed), Requested));
        assert!(p.allows(Some(Active), Active));
    }

    #[test]
    fn strict_follows_the_ladder() {
        let p = TradePolicy::Strict;
        assert!(p.allows(None, Requested));
        assert!(p.allows(Some(Active), Requested));
        assert!(p.allows(Some(Requested), Accepted));
        assert!(p.allows(Some(Accepted), Completed));
    }

    #[test]
    fn strict_allows_cancel_before_completion() {
        let p = TradePolicy::Strict;
        assert!(p.allows(Some(Requested), Active));
        assert!(p.allows(Some(Accepted), Active));
        assert!(!p.allows(Some(Completed), Active));
    }

    #[test]
    fn strict_rejects_skipping_steps() {
        let p = TradePolicy::Strict;
        assert!(!p.allows(None, Completed));
        assert!(!p.allows(Some(Requested), Completed));
        assert!(!p.allows(None, Accepted));
        assert!(!p.allows(Some(Requested), Requested));
    }

    #[test]
    fn check_reports_both_ends() {
        let err = TradePolicy::Strict
            .check("item-9", Some(Requested), Completed)
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::IllegalTransition {
                id: "item-9".into(),
                from: Some(Requested),
                to: Completed,
            }
        );
        assert_eq!(
            err.to_string(),
            "illegal trade transition for `item-9`: requested -> completed"
        );
    }

    #[test]
    fn unset_status_displays_as_none() {
        let err = TradePolicy::Strict.check("x", None, Accepted).unwrap_err();
        assert!(err.to_string().contains("none -> accepted"));
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        #[derive(Deserialize)]
        struct W {
            policy: TradePolicy,
        }
        let w: W = toml::from_str("policy = \"strict\"").unwrap();
        assert_eq!(w.policy, TradePolicy::Strict);
    }
}
