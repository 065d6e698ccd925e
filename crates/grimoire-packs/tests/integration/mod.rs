mod compile;
mod extract;
mod round_trip;
