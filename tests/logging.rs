mod common;

/// These run with a Debug-level logger installed, so every `debug!` in the
/// pipeline formats its arguments.  Kept in their own test binary because
/// the logger is process-wide.
#[cfg(test)]
mod logging_tests {
    use pretty_assertions::assert_eq;

    use crate::common::run_program;

    fn init_debug_logger() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    }

    #[test]
    fn test_instance_stored_in_its_own_field() {
        init_debug_logger();

        let source = "class A {} var a = A(); a.me = a; print a.me; print a.me.me == a;";

        assert_eq!(run_program(source).expect("runs"), "A instance\ntrue\n");
    }

    #[test]
    fn test_full_program_under_debug_logging() {
        init_debug_logger();

        let source = r#"
            class Node {
                init(next) { this.next = next; }
                last() {
                    if (this.next == nil) return this;
                    return this.next.last();
                }
            }
            var list = Node(Node(Node(nil)));
            list.next.next.next = list;
            print list.next;
            fun count(n) { if (n > 0) return count(n - 1); return "ok"; }
            print count(3);
        "#;

        assert_eq!(run_program(source).expect("runs"), "Node instance\nok\n");
    }
}
