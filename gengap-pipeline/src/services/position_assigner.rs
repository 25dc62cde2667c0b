//! Structural author-position assignment
//!
//! Maps an author-list length to the fixed position vocabulary. The
//! rule table depends only on the list length:
//!
//! | N   | sequence                                              |
//! |-----|-------------------------------------------------------|
//! | 1   | first                                                 |
//! | 2   | first, last                                           |
//! | 3   | first, second, last                                   |
//! | >=4 | first, second, middle x (N-4), penultimate, last      |
//!
//! An empty author list produces zero rows rather than an error, so a
//! publication with an unparseable author list never aborts a batch.

use gengap_common::db::Position;

/// Assign position labels for an author list of the given length.
/// The i-th element labels the author at index i.
pub fn assign_positions(author_count: usize) -> Vec<Position> {
    match author_count {
        0 => Vec::new(),
        1 => vec![Position::First],
        2 => vec![Position::First, Position::Last],
        3 => vec![Position::First, Position::Second, Position::Last],
        n => {
            let mut positions = Vec::with_capacity(n);
            positions.push(Position::First);
            positions.push(Position::Second);
            // Everyone strictly between second and penultimate;
            // empty for N=4
            positions.extend(std::iter::repeat(Position::Middle).take(n - 4));
            positions.push(Position::Penultimate);
            positions.push(Position::Last);
            positions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Position::*;

    #[test]
    fn table_driven_sequences() {
        let cases: [(usize, Vec<Position>); 7] = [
            (0, vec![]),
            (1, vec![First]),
            (2, vec![First, Last]),
            (3, vec![First, Second, Last]),
            (4, vec![First, Second, Penultimate, Last]),
            (5, vec![First, Second, Middle, Penultimate, Last]),
            (
                7,
                vec![First, Second, Middle, Middle, Middle, Penultimate, Last],
            ),
        ];

        for (n, expected) in cases {
            assert_eq!(assign_positions(n), expected, "author count {}", n);
        }
    }

    #[test]
    fn always_one_label_per_author() {
        for n in 0..50 {
            assert_eq!(assign_positions(n).len(), n);
        }
    }

    #[test]
    fn middle_count_grows_linearly() {
        for n in 4..30 {
            let middles = assign_positions(n)
                .iter()
                .filter(|p| **p == Middle)
                .count();
            assert_eq!(middles, n - 4);
        }
    }
}
