//! Player state transition table

use lumenplay_shared_types::PlayerState;

/// Checks whether `from -> to` is an edge of the transition table
///
/// # State Transitions
///
/// Valid transitions:
/// - Idle → Opening | Error
/// - Opening → Stopped | Error
/// - Stopped → Idle | Playing | Error
/// - Playing → Stopped | Paused | Seeking | Error
/// - Paused → Stopped | Playing | Seeking | Error
/// - Seeking → Stopped | Playing | Paused | Error
/// - Error → Idle
///
/// Every other edge is a programming error in the caller.
pub fn can_transition(from: PlayerState, to: PlayerState) -> bool {
    use PlayerState::*;

    match (from, to) {
        (Idle, Opening) | (Idle, Error) => true,

        (Opening, Stopped) | (Opening, Error) => true,

        (Stopped, Idle) | (Stopped, Playing) | (Stopped, Error) => true,

        (Playing, Stopped) | (Playing, Paused) | (Playing, Seeking) | (Playing, Error) => true,

        (Paused, Stopped) | (Paused, Playing) | (Paused, Seeking) | (Paused, Error) => true,

        (Seeking, Stopped) | (Seeking, Playing) | (Seeking, Paused) | (Seeking, Error) => true,

        (Error, Idle) => true,

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlayerState::*;

    const ALL: [PlayerState; 7] = [Idle, Opening, Stopped, Playing, Paused, Seeking, Error];

    #[test]
    fn test_full_table() {
        // (from, allowed targets) per the design table
        let table: [(PlayerState, &[PlayerState]); 7] = [
            (Idle, &[Opening, Error]),
            (Opening, &[Stopped, Error]),
            (Stopped, &[Idle, Playing, Error]),
            (Playing, &[Stopped, Paused, Seeking, Error]),
            (Paused, &[Stopped, Playing, Seeking, Error]),
            (Seeking, &[Stopped, Playing, Paused, Error]),
            (Error, &[Idle]),
        ];

        for (from, allowed) in table {
            for to in ALL {
                assert_eq!(
                    can_transition(from, to),
                    allowed.contains(&to),
                    "edge {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_no_self_edges() {
        for state in ALL {
            assert!(!can_transition(state, state));
        }
    }

    #[test]
    fn test_error_only_recovers_to_idle() {
        for to in ALL {
            assert_eq!(can_transition(Error, to), to == Idle);
        }
    }
}
