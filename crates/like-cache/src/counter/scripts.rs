//! Lua scripts executed atomically on the Redis server

/// KEYS[1] = user likes set, KEYS[2] = target counter, ARGV[1] = target id.
/// Returns `{liked, new_count}` with liked as 0/1.
pub(crate) const TOGGLE: &str = r"
local user_key = KEYS[1]
local count_key = KEYS[2]
local target = ARGV[1]

if redis.call('SISMEMBER', user_key, target) == 1 then
  redis.call('SREM', user_key, target)
  local current = tonumber(redis.call('GET', count_key) or '0')
  if current > 0 then
    return {0, redis.call('DECR', count_key)}
  end
  redis.call('SET', count_key, 0)
  return {0, 0}
end

redis.call('SADD', user_key, target)
return {1, redis.call('INCR', count_key)}
";

/// KEYS[1] = target counter. Returns the new count, never below zero.
pub(crate) const DECREMENT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current > 0 then
  return redis.call('DECR', KEYS[1])
end
redis.call('SET', KEYS[1], 0)
return 0
";
