/// Runs `func` when dropped, including during unwinding.
///
/// [`Defer::cancel`] disarms the guard once the protected section has
/// completed normally.
pub struct Defer<F: FnOnce()> {
    func: Option<F>,
}

impl<F: FnOnce()> Defer<F> {
    pub fn new(func: F) -> Defer<F> {
        Self { func: Some(func) }
    }

    pub fn cancel(mut self) {
        self.func = None;
    }
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(func) = self.func.take() {
            func()
        }
    }
}

#[cfg(test)]
mod test {
    use super::Defer;
    use std::cell::Cell;

    #[test]
    fn runs_on_scope_exit() {
        let ran = Cell::new(0);

        {
            defer! { ran.set(ran.get() + 1) }
            assert_eq!(ran.get(), 0);
        }

        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn cancelled_guard_does_nothing() {
        let ran = Cell::new(false);

        let guard = Defer::new(|| ran.set(true));
        guard.cancel();

        assert!(!ran.get());
    }
}
