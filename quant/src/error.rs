use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("graph operation error"))]
    Graph { source: tessera_ir::Error },

    /// Normalization node is neither batch norm variant.
    #[snafu(display("unexpected normalization target '{target}'"))]
    UnexpectedNormalization { target: String },

    #[snafu(display("convolution '{conv}' has no usable '{name}' argument at index {index}"))]
    MissingConvArgument { conv: String, name: String, index: usize },

    #[snafu(display("'{name}' of '{node}' must be a stored tensor, got {value}"))]
    NotTensorArgument { node: String, name: String, value: String },

    #[snafu(display("normalization '{node}' has no {name}"))]
    MissingStatistic { node: String, name: String },

    #[snafu(display("normalization '{node}' has non-numeric eps {value}"))]
    InvalidEps { node: String, value: String },

    #[snafu(display("{what} has {actual} channel(s), expected {expected}"))]
    ChannelMismatch { what: String, expected: usize, actual: usize },

    #[snafu(display("convolution weight must have at least 2 dimensions, got {rank}"))]
    InvalidWeightRank { rank: usize },

    /// Secondary normalization outputs are still consumed and folding was
    /// configured to refuse that.
    #[snafu(display("normalization '{node}' has {users} live secondary output user(s)"))]
    LiveNormalizationStatistics { node: String, users: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
