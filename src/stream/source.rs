use std::iter::Peekable;

/// A blocking, pull-based source of items, such as a record reader backed by
/// a file or a database cursor.
pub trait ItemSource {
    type Item;
    type Error;

    /// Whether another item can be pulled. May block.
    fn has_next(&mut self) -> bool;

    /// Pulls the next item. Only called after `has_next` returned `true`.
    fn next(&mut self) -> Result<Self::Item, Self::Error>;

    /// Releases whatever the source holds. Must be idempotent.
    fn close(&mut self);
}

impl<S: ItemSource + ?Sized> ItemSource for Box<S> {
    type Item = S::Item;
    type Error = S::Error;

    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn next(&mut self) -> Result<Self::Item, Self::Error> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Adapts a fallible iterator into an [`ItemSource`]. Closing drops the
/// iterator.
pub struct IterSource<I: Iterator> {
    iter: Option<Peekable<I>>,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: Some(iter.into_iter().peekable()),
        }
    }
}

impl<I, T, E> ItemSource for IterSource<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = T;
    type Error = E;

    fn has_next(&mut self) -> bool {
        self.iter.as_mut().is_some_and(|iter| iter.peek().is_some())
    }

    /// # Panics
    /// When called on an exhausted or closed source.
    fn next(&mut self) -> Result<T, E> {
        match self.iter.as_mut().and_then(Iterator::next) {
            Some(item) => item,
            None => panic!("IterSource::next called without a pending item"),
        }
    }

    fn close(&mut self) {
        self.iter = None;
    }
}
