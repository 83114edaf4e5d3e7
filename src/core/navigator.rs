//! Traversal order over the utterances of a session.

use rand::Rng;

/// Step direction for [`Navigator::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Backward),
            1 => Ok(Direction::Forward),
            other => Err(format!("Direction must be -1 or +1, got {}", other)),
        }
    }
}

/// Cursor over a (possibly shuffled) sequence of utterance indices
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    order: Vec<usize>,
    cursor: usize,
}

impl Navigator {
    pub fn new(n: usize, randomize: bool) -> Self {
        let mut nav = Self::default();
        nav.init(n, randomize);
        nav
    }

    /// Reset to `0..n`, shuffled with the thread RNG if `randomize`
    pub fn init(&mut self, n: usize, randomize: bool) {
        self.init_with_rng(n, randomize, &mut rand::thread_rng());
    }

    /// Reset to `0..n`, shuffled with `rng` if `randomize`
    pub fn init_with_rng<R: Rng + ?Sized>(&mut self, n: usize, randomize: bool, rng: &mut R) {
        self.order = (0..n).collect();
        if randomize {
            fisher_yates(&mut self.order, rng);
        }
        self.cursor = 0;
    }

    /// Utterance index under the cursor
    pub fn current(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    /// Move one step; returns false (and stays put) at either end
    pub fn advance(&mut self, direction: Direction) -> bool {
        let Some(next) = self.cursor.checked_add_signed(direction.step()) else {
            return false;
        };
        if next >= self.order.len() {
            return false;
        }
        self.cursor = next;
        true
    }

    /// Move the cursor to a position in the traversal order
    pub fn jump_to(&mut self, position: usize) -> bool {
        if position >= self.order.len() {
            return false;
        }
        self.cursor = position;
        true
    }

    /// Cursor position within the traversal order
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

/// In-place uniform shuffle
fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_bounds() {
        let mut nav = Navigator::new(5, false);
        assert_eq!(nav.current(), Some(0));

        for expected in 1..5 {
            assert!(nav.advance(Direction::Forward));
            assert_eq!(nav.current(), Some(expected));
        }

        assert!(!nav.advance(Direction::Forward));
        assert_eq!(nav.current(), Some(4));

        assert!(nav.jump_to(0));
        assert!(!nav.advance(Direction::Backward));
        assert_eq!(nav.current(), Some(0));
    }

    #[test]
    fn test_empty_navigator() {
        let mut nav = Navigator::new(0, true);
        assert_eq!(nav.current(), None);
        assert!(nav.is_empty());
        assert!(!nav.advance(Direction::Forward));
        assert!(!nav.advance(Direction::Backward));
        assert!(!nav.jump_to(0));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut nav = Navigator::default();
        nav.init_with_rng(50, true, &mut rng);

        let mut sorted = nav.order().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_eq!(nav.position(), 0);
    }

    #[test]
    fn test_shuffle_is_reproducible_with_seed() {
        let mut a = Navigator::default();
        let mut b = Navigator::default();
        a.init_with_rng(20, true, &mut StdRng::seed_from_u64(42));
        b.init_with_rng(20, true, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.order(), b.order());
    }

    #[test]
    fn test_init_resets_cursor() {
        let mut nav = Navigator::new(3, false);
        nav.advance(Direction::Forward);
        nav.init(3, false);
        assert_eq!(nav.position(), 0);
    }

    #[test]
    fn test_direction_from_i32() {
        assert_eq!(Direction::try_from(-1), Ok(Direction::Backward));
        assert_eq!(Direction::try_from(1), Ok(Direction::Forward));
        assert!(Direction::try_from(0).is_err());
        assert!(Direction::try_from(2).is_err());
    }
}
