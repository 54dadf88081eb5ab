use crate::pipeline::{Category, DisplayRecord};

/// Which categories the feed shows. Owned by the UI, read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    pub show_player_kills: bool,
    pub show_player_deaths: bool,
    pub show_other_kills: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            show_player_kills: true,
            show_player_deaths: true,
            show_other_kills: true,
        }
    }
}

impl FilterState {
    pub fn allows(&self, category: Category) -> bool {
        match category {
            Category::PlayerKill => self.show_player_kills,
            Category::PlayerDeath => self.show_player_deaths,
            Category::OtherKill => self.show_other_kills,
        }
    }

    pub fn toggle(&mut self, category: Category) {
        let flag = match category {
            Category::PlayerKill => &mut self.show_player_kills,
            Category::PlayerDeath => &mut self.show_player_deaths,
            Category::OtherKill => &mut self.show_other_kills,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTag {
    PlayerKill,
    PlayerDeath,
    OtherKill,
}

impl From<Category> for StyleTag {
    fn from(category: Category) -> Self {
        match category {
            Category::PlayerKill => StyleTag::PlayerKill,
            Category::PlayerDeath => StyleTag::PlayerDeath,
            Category::OtherKill => StyleTag::OtherKill,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLine {
    pub seq: u64,
    pub text: String,
    pub style: StyleTag,
}

pub fn apply_filters(records: &[DisplayRecord], filters: &FilterState) -> Vec<FeedLine> {
    records
        .iter()
        .filter(|record| filters.allows(record.category))
        .map(|record| FeedLine {
            seq: record.seq,
            text: record.text.clone(),
            style: record.category.into(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub player_kills: usize,
    pub player_deaths: usize,
    pub other_kills: usize,
}

pub fn tally(records: &[DisplayRecord]) -> Tally {
    records.iter().fold(Tally::default(), |mut tally, record| {
        match record.category {
            Category::PlayerKill => tally.player_kills += 1,
            Category::PlayerDeath => tally.player_deaths += 1,
            Category::OtherKill => tally.other_kills += 1,
        }
        tally
    })
}

/// Where the feed viewport sat the last time it was drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedScroll {
    pub offset: usize,
    pub total: usize,
    pub height: usize,
    pub generation: u64,
    pub top_seq: Option<u64>,
}

impl FeedScroll {
    pub fn at_bottom(&self) -> bool {
        self.offset + self.height >= self.total
    }

    /// Moves the viewport by `delta` lines over `lines`, clamped.
    pub fn scroll_by(&mut self, delta: isize, lines: &[FeedLine]) {
        let offset = self.offset.saturating_add_signed(delta);
        self.scroll_to(offset, lines);
    }

    pub fn scroll_to(&mut self, offset: usize, lines: &[FeedLine]) {
        self.total = lines.len();
        self.offset = offset.min(max_offset(lines.len(), self.height));
        self.top_seq = lines.get(self.offset).map(|line| line.seq);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollDirective {
    FollowTail,
    Restore {
        generation: u64,
        anchor: Option<u64>,
        fraction: f64,
    },
}

/// Decides, before the feed content changes, how to place the viewport
/// afterwards.
pub fn plan_scroll(previous: &FeedScroll) -> ScrollDirective {
    if previous.at_bottom() {
        return ScrollDirective::FollowTail;
    }

    let fraction = if previous.total == 0 {
        0.0
    } else {
        previous.offset as f64 / previous.total as f64
    };

    ScrollDirective::Restore {
        generation: previous.generation,
        anchor: previous.top_seq,
        fraction,
    }
}

/// Places the viewport over the new `lines`. The top record is kept when it
/// is still around in the same generation; otherwise the old relative
/// position is approximated.
pub fn apply_scroll(
    directive: ScrollDirective,
    lines: &[FeedLine],
    generation: u64,
    height: usize,
) -> FeedScroll {
    let total = lines.len();
    let max = max_offset(total, height);

    let offset = match directive {
        ScrollDirective::FollowTail => max,
        ScrollDirective::Restore {
            generation: previous_generation,
            anchor,
            fraction,
        } => {
            let anchored = anchor
                .filter(|_| previous_generation == generation)
                .map(|seq| lines.partition_point(|line| line.seq < seq))
                .filter(|index| *index < total);

            anchored
                .unwrap_or_else(|| (fraction * total as f64).round() as usize)
                .min(max)
        }
    };

    FeedScroll {
        offset,
        total,
        height,
        generation,
        top_seq: lines.get(offset).map(|line| line.seq),
    }
}

fn max_offset(total: usize, height: usize) -> usize {
    total.saturating_sub(height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, category: Category) -> DisplayRecord {
        DisplayRecord {
            seq,
            text: format!("event {seq}"),
            category,
        }
    }

    fn lines(count: u64) -> Vec<FeedLine> {
        (0..count)
            .map(|seq| FeedLine {
                seq,
                text: format!("event {seq}"),
                style: StyleTag::OtherKill,
            })
            .collect()
    }

    fn mixed_records() -> Vec<DisplayRecord> {
        vec![
            record(0, Category::PlayerKill),
            record(1, Category::OtherKill),
            record(2, Category::PlayerDeath),
            record(3, Category::PlayerKill),
            record(4, Category::OtherKill),
        ]
    }

    fn seqs(lines: &[FeedLine]) -> Vec<u64> {
        lines.iter().map(|line| line.seq).collect()
    }

    #[test]
    fn all_categories_shown_by_default() {
        let records = mixed_records();
        let visible = apply_filters(&records, &FilterState::default());
        assert_eq!(seqs(&visible), vec![0, 1, 2, 3, 4]);
        assert_eq!(visible[2].style, StyleTag::PlayerDeath);
    }

    #[test]
    fn toggling_removes_and_restores_one_category() {
        let records = mixed_records();
        let mut filters = FilterState::default();

        filters.toggle(Category::PlayerKill);
        assert_eq!(seqs(&apply_filters(&records, &filters)), vec![1, 2, 4]);

        filters.toggle(Category::OtherKill);
        assert_eq!(seqs(&apply_filters(&records, &filters)), vec![2]);

        filters.toggle(Category::PlayerKill);
        assert_eq!(seqs(&apply_filters(&records, &filters)), vec![0, 2, 3]);

        filters.toggle(Category::OtherKill);
        assert_eq!(seqs(&apply_filters(&records, &filters)), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn counts_each_category() {
        assert_eq!(
            tally(&mixed_records()),
            Tally {
                player_kills: 2,
                player_deaths: 1,
                other_kills: 2,
            }
        );
    }

    #[test]
    fn follows_tail_when_previously_at_bottom() {
        let before = apply_scroll(ScrollDirective::FollowTail, &lines(30), 1, 10);
        assert_eq!(before.offset, 20);
        assert!(before.at_bottom());

        let directive = plan_scroll(&before);
        assert_eq!(directive, ScrollDirective::FollowTail);

        let after = apply_scroll(directive, &lines(35), 1, 10);
        assert_eq!(after.offset, 25);
    }

    #[test]
    fn keeps_top_record_when_scrolled_up() {
        let current = lines(30);
        let mut scroll = apply_scroll(ScrollDirective::FollowTail, &current, 1, 10);
        scroll.scroll_by(-15, &current);
        assert_eq!(scroll.offset, 5);
        assert!(!scroll.at_bottom());

        let after = apply_scroll(plan_scroll(&scroll), &lines(60), 1, 10);
        assert_eq!(after.offset, 5);
        assert_eq!(after.top_seq, Some(5));
    }

    #[test]
    fn hidden_anchor_moves_to_next_visible_record() {
        let records = mixed_records();
        let all = apply_filters(&records, &FilterState::default());
        let mut scroll = apply_scroll(ScrollDirective::FollowTail, &all, 1, 2);
        scroll.scroll_to(1, &all);
        assert_eq!(scroll.top_seq, Some(1));

        let mut filters = FilterState::default();
        filters.toggle(Category::OtherKill);
        let filtered = apply_filters(&records, &filters);

        let after = apply_scroll(plan_scroll(&scroll), &filtered, 1, 2);
        assert_eq!(after.top_seq, Some(2));
        assert_eq!(after.offset, 1);
    }

    #[test]
    fn new_generation_restores_relative_position() {
        let mut scroll = apply_scroll(ScrollDirective::FollowTail, &lines(100), 1, 10);
        scroll.scroll_to(25, &lines(100));

        let after = apply_scroll(plan_scroll(&scroll), &lines(40), 2, 10);
        assert_eq!(after.offset, 10);
        assert_eq!(after.generation, 2);
    }

    #[test]
    fn empty_feed_is_at_bottom() {
        let scroll = FeedScroll::default();
        assert!(scroll.at_bottom());
        assert_eq!(plan_scroll(&scroll), ScrollDirective::FollowTail);

        let placed = apply_scroll(ScrollDirective::FollowTail, &[], 0, 10);
        assert_eq!(placed.offset, 0);
        assert_eq!(placed.top_seq, None);
    }
}
