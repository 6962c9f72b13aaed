//! `proptest` strategies that generate small, well-formed C-subset source
//! snippets for the property tests in [`super`].

use proptest::prelude::*;

/// A single `main` function wrapping one arithmetic expression statement,
/// e.g. `int main() { int x; x = (2 + 3) * 4; }`.
pub fn arbitrary_arithmetic_program() -> impl Strategy<Value = String> {
    arbitrary_expr(3).prop_map(|expr| format!("int main() {{ int x; x = {expr}; }}"))
}

fn arbitrary_expr(depth: u32) -> BoxedStrategy<String> {
    let leaf = (1i32..100).prop_map(|n| n.to_string()).boxed();
    if depth == 0 {
        return leaf;
    }
    leaf.prop_recursive(depth, 32, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone(), prop::sample::select(vec!["+", "-", "*"]))
                .prop_map(|(a, b, op)| format!("({a} {op} {b})")),
        ]
    })
    .boxed()
}

/// A `main` function containing one bounded `for` loop whose body is a
/// single `printf` call, e.g. `int main() { int i; for (i=0;i<4;i=i+1)
/// printf("%d", i); }`.
pub fn arbitrary_loop_program() -> impl Strategy<Value = String> {
    (1u32..8).prop_map(|bound| {
        format!("int main() {{ int i; for (i = 0; i < {bound}; i = i + 1) {{ printf(\"%d\", i); }} }}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn arithmetic_programs_are_parseable_c_subset(src in arbitrary_arithmetic_program()) {
            prop_assert!(src.contains("int main()"));
        }
    }
}
