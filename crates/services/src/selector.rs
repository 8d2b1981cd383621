use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use prep_core::model::{
    AdaptiveState, Difficulty, QuestionId, QuestionRecord, SectionId, TopicId,
};
use prep_core::scheduler::Scheduler;

/// Topics need at least this many attempts before they can be called weak.
pub const WEAK_TOPIC_MIN_ATTEMPTS: u32 = 5;

/// Topic accuracy below this marks the topic as weak.
pub const WEAK_TOPIC_THRESHOLD: f64 = 0.70;

/// At most this many questions per weak topic in one selection.
pub const MAX_PER_WEAK_TOPIC: usize = 2;

//
// ─── SELECTION OUTPUT ──────────────────────────────────────────────────────────
//

/// Why a question made it into the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Scheduled for review and overdue.
    ReviewDue,
    /// Belongs to a topic the learner is measurably weak in.
    WeakTopic,
    /// Chosen by the section round-robin fill.
    Balanced,
    /// Chosen by the difficulty-matched fill.
    DifficultyMatch,
}

impl SelectionReason {
    /// Numeric rank used to order the final list, highest first.
    #[must_use]
    pub fn priority(self) -> u32 {
        match self {
            SelectionReason::ReviewDue => 400,
            SelectionReason::WeakTopic => 300,
            SelectionReason::Balanced => 200,
            SelectionReason::DifficultyMatch => 100,
        }
    }
}

/// One selected question with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub id: QuestionId,
    pub reason: SelectionReason,
    pub priority: u32,
}

impl SelectedQuestion {
    fn new(id: QuestionId, reason: SelectionReason) -> Self {
        Self {
            id,
            priority: reason.priority(),
            reason,
        }
    }
}

//
// ─── CRITERIA ──────────────────────────────────────────────────────────────────
//

/// Which difficulty the fill stage aims for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifficultyTarget {
    /// Follow the learner's current adaptive tier.
    #[default]
    Adaptive,
    /// Pin a specific tier regardless of the adaptive state.
    Fixed(Difficulty),
}

/// Caller-facing knobs for one selection request.
///
/// Defaults reproduce the standard practice flow: exclude recently seen
/// questions, surface weak topics and due reviews, fill at the adaptive
/// difficulty without section balancing.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCriteria {
    pub count: usize,
    pub sections: Vec<SectionId>,
    pub topics: Vec<TopicId>,
    pub difficulty: DifficultyTarget,
    pub exclude_recently_seen: bool,
    pub prioritize_weak_topics: bool,
    pub include_review_due: bool,
    pub balance_sections: bool,
}

impl SelectionCriteria {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count,
            sections: Vec::new(),
            topics: Vec::new(),
            difficulty: DifficultyTarget::Adaptive,
            exclude_recently_seen: true,
            prioritize_weak_topics: true,
            include_review_due: true,
            balance_sections: false,
        }
    }

    #[must_use]
    pub fn sections(mut self, sections: Vec<SectionId>) -> Self {
        self.sections = sections;
        self
    }

    #[must_use]
    pub fn topics(mut self, topics: Vec<TopicId>) -> Self {
        self.topics = topics;
        self
    }

    #[must_use]
    pub fn difficulty(mut self, target: DifficultyTarget) -> Self {
        self.difficulty = target;
        self
    }

    #[must_use]
    pub fn exclude_recently_seen(mut self, exclude: bool) -> Self {
        self.exclude_recently_seen = exclude;
        self
    }

    #[must_use]
    pub fn prioritize_weak_topics(mut self, prioritize: bool) -> Self {
        self.prioritize_weak_topics = prioritize;
        self
    }

    #[must_use]
    pub fn include_review_due(mut self, include: bool) -> Self {
        self.include_review_due = include;
        self
    }

    #[must_use]
    pub fn balance_sections(mut self, balance: bool) -> Self {
        self.balance_sections = balance;
        self
    }
}

//
// ─── TOPIC WEIGHTS ─────────────────────────────────────────────────────────────
//

/// Per-topic emphasis multipliers, typically loaded from configuration to
/// mirror the exam blueprint. Unlisted topics weigh `1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicWeights(BTreeMap<TopicId, f64>);

impl TopicWeights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, topic: TopicId, weight: f64) {
        self.0.insert(topic, weight);
    }

    #[must_use]
    pub fn with(mut self, topic: TopicId, weight: f64) -> Self {
        self.set(topic, weight);
        self
    }

    #[must_use]
    pub fn weight(&self, topic: &TopicId) -> f64 {
        self.0.get(topic).copied().unwrap_or(1.0)
    }
}

//
// ─── SELECTOR ──────────────────────────────────────────────────────────────────
//

/// Assembles a practice set from the content bank and the adaptive state.
///
/// Selection runs in three stages — due reviews, weak topics, then a
/// shuffled difficulty-aware fill — and never repeats a question within one
/// result. The selector only reads the state; recording answers is the
/// mastery service's job.
#[derive(Debug, Clone, Default)]
pub struct QuestionSelector {
    scheduler: Scheduler,
    weights: TopicWeights,
}

impl QuestionSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_weights(mut self, weights: TopicWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Select up to `criteria.count` questions, highest priority first.
    ///
    /// Returns fewer when the filtered pool runs out. The recently-seen
    /// exclusion is relaxed before returning short: an already-seen question
    /// beats an empty slot. Due reviews are exempt from the exclusion
    /// entirely, their timing is the whole point.
    #[must_use]
    pub fn select(
        &self,
        catalog: &[QuestionRecord],
        state: &AdaptiveState,
        criteria: &SelectionCriteria,
        now: DateTime<Utc>,
    ) -> Vec<SelectedQuestion> {
        if criteria.count == 0 {
            return Vec::new();
        }

        let pool: Vec<&QuestionRecord> = catalog
            .iter()
            .filter(|q| criteria.sections.is_empty() || criteria.sections.contains(q.section()))
            .filter(|q| {
                criteria.topics.is_empty()
                    || q.topic().is_some_and(|t| criteria.topics.contains(t))
            })
            .collect();

        let mut chosen: Vec<SelectedQuestion> = Vec::new();
        let mut chosen_ids: HashSet<QuestionId> = HashSet::new();

        if criteria.include_review_due {
            self.pick_due(&pool, state, criteria, now, &mut chosen, &mut chosen_ids);
        }
        if criteria.prioritize_weak_topics && chosen.len() < criteria.count {
            self.pick_weak_topics(&pool, state, criteria, &mut chosen, &mut chosen_ids);
        }
        if chosen.len() < criteria.count {
            self.fill(&pool, state, criteria, &mut chosen, &mut chosen_ids);
        }

        chosen.sort_by_key(|s| std::cmp::Reverse(s.priority));
        chosen.truncate(criteria.count);
        chosen
    }

    /// Stage one: overdue reviews, most overdue first, capped at a fifth of
    /// the requested count so review never crowds out new material.
    fn pick_due(
        &self,
        pool: &[&QuestionRecord],
        state: &AdaptiveState,
        criteria: &SelectionCriteria,
        now: DateTime<Utc>,
        chosen: &mut Vec<SelectedQuestion>,
        chosen_ids: &mut HashSet<QuestionId>,
    ) {
        let cap = criteria.count.div_ceil(5);
        let in_pool: HashSet<&QuestionId> = pool.iter().map(|q| q.id()).collect();

        for id in state.due_for_review(&self.scheduler, now) {
            if chosen.len() >= cap {
                break;
            }
            if in_pool.contains(&id) && chosen_ids.insert(id.clone()) {
                chosen.push(SelectedQuestion::new(id, SelectionReason::ReviewDue));
            }
        }
    }

    /// Stage two: questions from weak topics, strongest signal first.
    ///
    /// A topic's signal is `weight x (1 - accuracy)`, so blueprint emphasis
    /// and how badly the learner is doing both pull in the same direction.
    fn pick_weak_topics(
        &self,
        pool: &[&QuestionRecord],
        state: &AdaptiveState,
        criteria: &SelectionCriteria,
        chosen: &mut Vec<SelectedQuestion>,
        chosen_ids: &mut HashSet<QuestionId>,
    ) {
        let mut weak: Vec<(TopicId, f64)> = state
            .sections()
            .iter()
            .filter(|(id, _)| criteria.sections.is_empty() || criteria.sections.contains(id))
            .flat_map(|(_, section)| section.topics().iter())
            .filter(|(_, stats)| {
                stats.attempts() >= WEAK_TOPIC_MIN_ATTEMPTS
                    && stats.accuracy() < WEAK_TOPIC_THRESHOLD
            })
            .map(|(topic, stats)| {
                let score = self.weights.weight(topic) * (1.0 - stats.accuracy());
                (topic.clone(), score)
            })
            .collect();
        weak.sort_by(|(a_id, a), (b_id, b)| {
            b.partial_cmp(a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a_id.cmp(b_id))
        });

        for (topic, _) in weak {
            let mut taken = 0;
            for question in pool {
                if chosen.len() >= criteria.count || taken >= MAX_PER_WEAK_TOPIC {
                    break;
                }
                if question.topic() != Some(&topic) {
                    continue;
                }
                if criteria.exclude_recently_seen && state.has_recently_seen(question.id()) {
                    continue;
                }
                if chosen_ids.insert(question.id().clone()) {
                    chosen.push(SelectedQuestion::new(
                        question.id().clone(),
                        SelectionReason::WeakTopic,
                    ));
                    taken += 1;
                }
            }
        }
    }

    /// Stage three: shuffled fill at the target difficulty.
    ///
    /// Matched-difficulty questions go first, the rest follow as fallback.
    /// Already-seen questions come last, used only when nothing else is
    /// left. With `balance_sections` the fill round-robins across sections
    /// instead.
    fn fill(
        &self,
        pool: &[&QuestionRecord],
        state: &AdaptiveState,
        criteria: &SelectionCriteria,
        chosen: &mut Vec<SelectedQuestion>,
        chosen_ids: &mut HashSet<QuestionId>,
    ) {
        let target = match criteria.difficulty {
            DifficultyTarget::Adaptive => state.difficulty(),
            DifficultyTarget::Fixed(d) => d,
        };

        let mut fresh: Vec<&QuestionRecord> = Vec::new();
        let mut seen: Vec<&QuestionRecord> = Vec::new();
        for &question in pool {
            if chosen_ids.contains(question.id()) {
                continue;
            }
            if criteria.exclude_recently_seen && state.has_recently_seen(question.id()) {
                seen.push(question);
            } else {
                fresh.push(question);
            }
        }

        let mut rng = rand::rng();
        fresh.shuffle(&mut rng);
        seen.shuffle(&mut rng);

        let ordered = ordered_by_difficulty(fresh, target)
            .into_iter()
            .chain(ordered_by_difficulty(seen, target));

        let reason = if criteria.balance_sections {
            SelectionReason::Balanced
        } else {
            SelectionReason::DifficultyMatch
        };

        if criteria.balance_sections {
            let mut by_section: BTreeMap<SectionId, VecDeque<&QuestionRecord>> = BTreeMap::new();
            for question in ordered {
                by_section
                    .entry(question.section().clone())
                    .or_default()
                    .push_back(question);
            }
            while chosen.len() < criteria.count {
                let mut picked_any = false;
                for queue in by_section.values_mut() {
                    if chosen.len() >= criteria.count {
                        break;
                    }
                    if let Some(question) = queue.pop_front() {
                        if chosen_ids.insert(question.id().clone()) {
                            chosen.push(SelectedQuestion::new(question.id().clone(), reason));
                        }
                        picked_any = true;
                    }
                }
                if !picked_any {
                    break;
                }
            }
        } else {
            for question in ordered {
                if chosen.len() >= criteria.count {
                    break;
                }
                if chosen_ids.insert(question.id().clone()) {
                    chosen.push(SelectedQuestion::new(question.id().clone(), reason));
                }
            }
        }
    }
}

/// Stable reorder: questions at `target` difficulty first, others after,
/// preserving the (shuffled) relative order within each group.
fn ordered_by_difficulty(
    questions: Vec<&QuestionRecord>,
    target: Difficulty,
) -> Vec<&QuestionRecord> {
    let (matched, rest): (Vec<_>, Vec<_>) = questions
        .into_iter()
        .partition(|q| q.difficulty() == target);
    matched.into_iter().chain(rest).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prep_core::difficulty::DifficultyAdapter;
    use prep_core::model::AnswerEvent;
    use prep_core::time::fixed_now;

    fn question(id: &str, section: &str, topic: Option<&str>, difficulty: Difficulty) -> QuestionRecord {
        QuestionRecord::new(
            QuestionId::new(id),
            SectionId::new(section),
            topic.map(TopicId::new),
            difficulty,
            Vec::new(),
        )
    }

    fn state_for(sections: &[&str]) -> AdaptiveState {
        AdaptiveState::new(sections.iter().map(|s| SectionId::new(*s)))
    }

    fn record(state: &mut AdaptiveState, id: &str, section: &str, topic: Option<&str>, ok: bool) {
        let mut event = AnswerEvent::new(QuestionId::new(id), SectionId::new(section), ok);
        if let Some(topic) = topic {
            event = event.with_topic(TopicId::new(topic));
        }
        state
            .record_answer(&event, &Scheduler::new(), &DifficultyAdapter::new(), fixed_now())
            .unwrap();
    }

    fn ids(selected: &[SelectedQuestion]) -> Vec<&str> {
        selected.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn empty_request_and_empty_catalog_yield_nothing() {
        let state = state_for(&["networking"]);
        let selector = QuestionSelector::new();

        assert!(selector
            .select(&[], &state, &SelectionCriteria::new(5), fixed_now())
            .is_empty());

        let catalog = [question("q1", "networking", None, Difficulty::Medium)];
        assert!(selector
            .select(&catalog, &state, &SelectionCriteria::new(0), fixed_now())
            .is_empty());
    }

    #[test]
    fn returns_fewer_when_pool_is_small() {
        let state = state_for(&["networking"]);
        let catalog = [
            question("q1", "networking", None, Difficulty::Medium),
            question("q2", "networking", None, Difficulty::Medium),
            question("q3", "networking", None, Difficulty::Medium),
        ];

        let selected =
            QuestionSelector::new().select(&catalog, &state, &SelectionCriteria::new(5), fixed_now());
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn never_selects_the_same_question_twice() {
        let mut state = state_for(&["networking"]);
        // q1 is both due for review and in the pool for the fill stage.
        record(&mut state, "q1", "networking", None, false);

        let catalog = [
            question("q1", "networking", None, Difficulty::Medium),
            question("q2", "networking", None, Difficulty::Medium),
        ];
        let later = fixed_now() + Duration::days(2);
        let selected = QuestionSelector::new()
            .select(&catalog, &state, &SelectionCriteria::new(5), later);

        let unique: HashSet<&QuestionId> = selected.iter().map(|s| &s.id).collect();
        assert_eq!(unique.len(), selected.len());
    }

    #[test]
    fn due_reviews_lead_and_are_capped() {
        let mut state = state_for(&["networking"]);
        for i in 0..5 {
            record(&mut state, &format!("due{i}"), "networking", None, false);
        }

        let mut catalog: Vec<QuestionRecord> = (0..5)
            .map(|i| question(&format!("due{i}"), "networking", None, Difficulty::Medium))
            .collect();
        for i in 0..10 {
            catalog.push(question(&format!("new{i}"), "networking", None, Difficulty::Medium));
        }

        let later = fixed_now() + Duration::days(2);
        let selected = QuestionSelector::new()
            .select(&catalog, &state, &SelectionCriteria::new(10), later);

        let due: Vec<&SelectedQuestion> = selected
            .iter()
            .filter(|s| s.reason == SelectionReason::ReviewDue)
            .collect();
        assert_eq!(due.len(), 2, "10 requested, cap is ceil(10/5)");
        assert_eq!(selected[0].reason, SelectionReason::ReviewDue);
        assert_eq!(selected[1].reason, SelectionReason::ReviewDue);
        assert_eq!(selected[0].priority, 400);
    }

    #[test]
    fn due_reviews_ignore_the_recently_seen_exclusion() {
        let mut state = state_for(&["networking"]);
        record(&mut state, "q1", "networking", None, false);
        assert!(state.has_recently_seen(&QuestionId::new("q1")));

        let catalog = [question("q1", "networking", None, Difficulty::Medium)];
        let later = fixed_now() + Duration::days(2);
        let selected = QuestionSelector::new()
            .select(&catalog, &state, &SelectionCriteria::new(3), later);

        assert_eq!(ids(&selected), ["q1"]);
        assert_eq!(selected[0].reason, SelectionReason::ReviewDue);
    }

    #[test]
    fn weak_topics_beat_the_plain_fill() {
        let mut state = state_for(&["networking"]);
        // "subnetting" goes weak: 6 attempts, 1 correct.
        for i in 0..6 {
            record(
                &mut state,
                &format!("hist{i}"),
                "networking",
                Some("subnetting"),
                i == 0,
            );
        }

        let catalog = [
            question("w1", "networking", Some("subnetting"), Difficulty::Medium),
            question("w2", "networking", Some("subnetting"), Difficulty::Medium),
            question("w3", "networking", Some("subnetting"), Difficulty::Medium),
            question("f1", "networking", Some("routing"), Difficulty::Medium),
            question("f2", "networking", Some("routing"), Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(4).include_review_due(false);
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        let weak: Vec<&str> = selected
            .iter()
            .filter(|s| s.reason == SelectionReason::WeakTopic)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(weak, ["w1", "w2"], "at most two per weak topic, in pool order");
        assert_eq!(selected[0].priority, 300);
    }

    #[test]
    fn topic_weights_order_competing_weak_topics() {
        let mut state = state_for(&["networking"]);
        // Both topics weak with identical accuracy (1/5).
        for i in 0..5 {
            record(&mut state, &format!("a{i}"), "networking", Some("acls"), i == 0);
            record(&mut state, &format!("b{i}"), "networking", Some("bgp"), i == 0);
        }

        let catalog = [
            question("qa", "networking", Some("acls"), Difficulty::Medium),
            question("qb", "networking", Some("bgp"), Difficulty::Medium),
        ];
        let weights = TopicWeights::new().with(TopicId::new("bgp"), 3.0);
        let criteria = SelectionCriteria::new(1).include_review_due(false);
        let selected = QuestionSelector::new()
            .with_weights(weights)
            .select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(ids(&selected), ["qb"], "heavier topic wins the tie");
    }

    #[test]
    fn struggling_topic_outranks_a_passing_one_at_any_weight() {
        let mut state = state_for(&["networking"]);
        // "acls": 2/6 correct, well below threshold. "bgp": 5/6, above it.
        for i in 0..6 {
            record(&mut state, &format!("a{i}"), "networking", Some("acls"), i < 2);
            record(&mut state, &format!("b{i}"), "networking", Some("bgp"), i != 0);
        }

        let catalog = [
            question("qa", "networking", Some("acls"), Difficulty::Medium),
            question("qb", "networking", Some("bgp"), Difficulty::Medium),
        ];
        // Even a tiny weight on the struggling topic cannot demote it below
        // a topic that is not weak at all.
        let weights = TopicWeights::new().with(TopicId::new("acls"), 0.05);
        let criteria = SelectionCriteria::new(2).include_review_due(false);
        let selected = QuestionSelector::new()
            .with_weights(weights)
            .select(&catalog, &state, &criteria, fixed_now());

        let weak: Vec<&str> = selected
            .iter()
            .filter(|s| s.reason == SelectionReason::WeakTopic)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(weak, ["qa"], "only the below-threshold topic is weak");
    }

    #[test]
    fn topics_below_minimum_sample_are_not_weak() {
        let mut state = state_for(&["networking"]);
        // 4 attempts, all wrong: terrible accuracy but below the sample floor.
        for i in 0..4 {
            record(&mut state, &format!("h{i}"), "networking", Some("nat"), false);
        }

        let catalog = [
            question("w1", "networking", Some("nat"), Difficulty::Medium),
            question("f1", "networking", None, Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(2).include_review_due(false);
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert!(
            selected.iter().all(|s| s.reason != SelectionReason::WeakTopic),
            "no weak-topic picks below the minimum sample"
        );
    }

    #[test]
    fn fill_prefers_the_target_difficulty() {
        let state = state_for(&["networking"]);
        let catalog = [
            question("e1", "networking", None, Difficulty::Easy),
            question("h1", "networking", None, Difficulty::Hard),
            question("h2", "networking", None, Difficulty::Hard),
            question("e2", "networking", None, Difficulty::Easy),
        ];
        let criteria =
            SelectionCriteria::new(2).difficulty(DifficultyTarget::Fixed(Difficulty::Hard));
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|s| s.id.as_str().starts_with('h')));
        assert!(selected.iter().all(|s| s.reason == SelectionReason::DifficultyMatch));
    }

    #[test]
    fn fill_falls_back_across_difficulties() {
        let state = state_for(&["networking"]);
        let catalog = [
            question("e1", "networking", None, Difficulty::Easy),
            question("h1", "networking", None, Difficulty::Hard),
        ];
        let criteria =
            SelectionCriteria::new(2).difficulty(DifficultyTarget::Fixed(Difficulty::Hard));
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(selected.len(), 2, "off-difficulty questions fill the gap");
    }

    #[test]
    fn recently_seen_questions_come_back_only_as_a_last_resort() {
        let mut state = state_for(&["networking"]);
        record(&mut state, "seen1", "networking", None, true);

        let catalog = [
            question("seen1", "networking", None, Difficulty::Medium),
            question("fresh1", "networking", None, Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(1).include_review_due(false);
        let selector = QuestionSelector::new();

        let selected = selector.select(&catalog, &state, &criteria, fixed_now());
        assert_eq!(ids(&selected), ["fresh1"], "fresh question preferred");

        let criteria = SelectionCriteria::new(2).include_review_due(false);
        let selected = selector.select(&catalog, &state, &criteria, fixed_now());
        assert_eq!(selected.len(), 2, "exclusion relaxes rather than running short");
    }

    #[test]
    fn section_filter_limits_the_pool() {
        let state = state_for(&["networking", "security"]);
        let catalog = [
            question("n1", "networking", None, Difficulty::Medium),
            question("s1", "security", None, Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(5).sections(vec![SectionId::new("security")]);
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(ids(&selected), ["s1"]);
    }

    #[test]
    fn topic_filter_limits_the_pool() {
        let state = state_for(&["networking"]);
        let catalog = [
            question("q1", "networking", Some("ospf"), Difficulty::Medium),
            question("q2", "networking", Some("bgp"), Difficulty::Medium),
            question("q3", "networking", None, Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(5).topics(vec![TopicId::new("ospf")]);
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(ids(&selected), ["q1"]);
    }

    #[test]
    fn balanced_fill_round_robins_sections() {
        let state = state_for(&["networking", "security"]);
        let catalog = [
            question("n1", "networking", None, Difficulty::Medium),
            question("n2", "networking", None, Difficulty::Medium),
            question("n3", "networking", None, Difficulty::Medium),
            question("s1", "security", None, Difficulty::Medium),
        ];
        let criteria = SelectionCriteria::new(4).balance_sections(true);
        let selected = QuestionSelector::new().select(&catalog, &state, &criteria, fixed_now());

        assert_eq!(selected.len(), 4);
        assert!(selected.iter().all(|s| s.reason == SelectionReason::Balanced));
        // One question from each section before any section repeats.
        let first_two: HashSet<&str> = selected[..2]
            .iter()
            .map(|s| if s.id.as_str().starts_with('n') { "n" } else { "s" })
            .collect();
        assert_eq!(first_two.len(), 2);
    }

    #[test]
    fn priorities_are_sorted_descending() {
        let mut state = state_for(&["networking"]);
        record(&mut state, "due1", "networking", None, false);
        for i in 0..5 {
            record(&mut state, &format!("w{i}"), "networking", Some("stp"), false);
        }

        let catalog = [
            question("fill1", "networking", None, Difficulty::Medium),
            question("weak1", "networking", Some("stp"), Difficulty::Medium),
            question("due1", "networking", None, Difficulty::Medium),
        ];
        let later = fixed_now() + Duration::days(2);
        let selected =
            QuestionSelector::new().select(&catalog, &state, &SelectionCriteria::new(3), later);

        let priorities: Vec<u32> = selected.iter().map(|s| s.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(selected[0].id, QuestionId::new("due1"));
    }
}
