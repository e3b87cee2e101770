//! The per-channel sample source driven by the renderer.

/// One channel of an instrument, producing internal-rate samples.
///
/// A voice owns all of its state, including its random stream, so two
/// voices never share anything and can run on separate threads.
pub trait Voice {
    /// Next internal-rate sample.
    fn process(&mut self) -> f64;

    /// First sample of the render.
    ///
    /// Voices with a silent lead-in override this to skip it.
    fn first_sample(&mut self) -> f64 {
        self.process()
    }

    /// Output-rate length of the dry sound, if the voice reports one.
    fn dry_length(&self) -> Option<usize> {
        None
    }
}

impl<V: Voice + ?Sized> Voice for &mut V {
    fn process(&mut self) -> f64 {
        (**self).process()
    }

    fn first_sample(&mut self) -> f64 {
        (**self).first_sample()
    }

    fn dry_length(&self) -> Option<usize> {
        (**self).dry_length()
    }
}
