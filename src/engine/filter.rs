use crate::config::{Config, FilterMode};
use crate::feed::types::CandidateItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    AlreadyDone,
    Whitelisted,
    Blacklisted,
    GroupBlocked,
    KeywordBlocked,
    KeywordNotAllowed,
    QuotaExhausted,
}

impl FilterReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterReason::AlreadyDone => "already-done",
            FilterReason::Whitelisted => "whitelisted",
            FilterReason::Blacklisted => "blacklisted",
            FilterReason::GroupBlocked => "group-blocked",
            FilterReason::KeywordBlocked => "keyword-blocked",
            FilterReason::KeywordNotAllowed => "keyword-not-allowed",
            FilterReason::QuotaExhausted => "quota-exhausted",
        }
    }
}

/// Result of evaluating one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub reason: Option<FilterReason>,
}

impl Verdict {
    fn accept(reason: Option<FilterReason>) -> Self {
        Self {
            outcome: Outcome::Accept,
            reason,
        }
    }

    fn reject(reason: FilterReason) -> Self {
        Self {
            outcome: Outcome::Reject,
            reason: Some(reason),
        }
    }

    pub fn is_accept(&self) -> bool {
        self.outcome == Outcome::Accept
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDecision {
    pub candidate: CandidateItem,
    pub verdict: Verdict,
}

fn in_blocked_group(candidate: &CandidateItem, config: &Config) -> bool {
    if let Some(group) = &candidate.group {
        if config.block_groups.contains_key(group) {
            return true;
        }
    }
    config
        .block_groups
        .values()
        .any(|members| members.iter().any(|m| m == &candidate.owner))
}

/// Decide one candidate. First matching rule wins; the whitelist
/// short-circuits every rule after the already-done check.
pub fn evaluate(candidate: &CandidateItem, config: &Config) -> Verdict {
    if candidate.already_acted {
        return Verdict::reject(FilterReason::AlreadyDone);
    }
    if config.white_list.iter().any(|w| w == &candidate.owner) {
        return Verdict::accept(Some(FilterReason::Whitelisted));
    }
    if config.blocked.iter().any(|b| b == &candidate.owner) {
        return Verdict::reject(FilterReason::Blacklisted);
    }
    if in_blocked_group(candidate, config) {
        return Verdict::reject(FilterReason::GroupBlocked);
    }

    let mut keywords = config.filter_keywords.iter().filter(|k| !k.is_empty());
    match config.filter_mode {
        FilterMode::Block => {
            if keywords.any(|k| candidate.content.contains(k.as_str())) {
                return Verdict::reject(FilterReason::KeywordBlocked);
            }
        }
        FilterMode::Allow => {
            let mut keywords = keywords.peekable();
            // No keywords configured means nothing to restrict on.
            if keywords.peek().is_some()
                && !keywords.any(|k| candidate.content.contains(k.as_str()))
            {
                return Verdict::reject(FilterReason::KeywordNotAllowed);
            }
        }
    }
    Verdict::accept(None)
}

/// Evaluate a scan in document order.
pub fn decide(candidates: Vec<CandidateItem>, config: &Config) -> Vec<FilterDecision> {
    candidates
        .into_iter()
        .map(|candidate| {
            let verdict = evaluate(&candidate, config);
            FilterDecision { candidate, verdict }
        })
        .collect()
}

/// Turn every accepted decision into a quota-exhausted rejection.
pub fn gate_on_quota(decisions: &mut [FilterDecision]) {
    for decision in decisions.iter_mut().filter(|d| d.verdict.is_accept()) {
        decision.verdict = Verdict::reject(FilterReason::QuotaExhausted);
    }
}
